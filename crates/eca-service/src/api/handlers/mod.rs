//! API request handlers

mod cache;
mod health;
mod validation;

pub use cache::*;
pub use health::*;
pub use validation::*;

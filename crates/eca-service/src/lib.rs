//! ecad library
//!
//! REST surface for the ECA decision engine:
//! - `POST /eca` commit validation
//! - health and cache administration endpoints
//! - layered configuration and server lifecycle

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use api::{create_router, AppState};
pub use config::EcaConfig;
pub use error::{ApiError, ServiceError};
pub use server::{build_state, Server};

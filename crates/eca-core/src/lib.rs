//! Decision engine for contributor-agreement validation of git commits.
//!
//! Each incoming batch of commits is checked for structure, the author and committer
//! are resolved against an identity directory, and access is granted either through
//! committer (or bot) standing on the target project or through a signed agreement
//! plus a matching `Signed-off-by` footer. Directory lookups go through a TTL cache
//! with single-flight loading; outbound directory credentials come from a shared,
//! serially refreshed bearer token.

#![deny(unsafe_code)]

pub mod cache;
pub mod checker;
pub mod classifier;
pub mod directory;
pub mod error;
pub mod response;
pub mod token;
pub mod types;
pub mod validator;

pub use cache::{CacheConfig, CacheKey, CacheLayer, CacheValue};
pub use checker::CommitChecker;
pub use classifier::{AccessClassifier, CommitterAccess};
pub use directory::{BotDirectory, DirectoryError, IdentityDirectory, ProjectDirectory};
pub use error::EcaError;
pub use response::{ApiStatusCode, CommitStatus, StatusMessage, ValidationResponse, NIL_HASH_KEY};
pub use token::{AccessToken, TokenError, TokenGuard, TokenProvider};
pub use types::{
    Agreement, BotUser, Commit, GitIdentity, Identity, Project, Provider, ValidationRequest,
};
pub use validator::{InvalidCommitPolicy, MergeCommitPolicy, RequestValidator, ValidationPolicy};

//! Collaborator implementations for the ECA decision engine.
//!
//! Remote clients talk to the accounts, projects and bots APIs over HTTP; the fixture
//! directory serves a fixed sample data set for local runs and tests.

#![deny(unsafe_code)]

pub mod accounts;
pub mod bots;
pub mod fixtures;
pub mod oauth;
pub mod projects;

pub use accounts::AccountsClient;
pub use bots::BotsClient;
pub use fixtures::{FixtureDirectory, StaticTokenProvider};
pub use oauth::{ClientCredentialsProvider, OAuthConfig};
pub use projects::ProjectsClient;

use eca_core::DirectoryError;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Shared HTTP client for all directory calls.
pub fn build_http_client(timeout: Duration) -> Result<Client, AdapterError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(concat!("ecad/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

pub(crate) fn normalize_base(url: impl Into<String>) -> String {
    url.into().trim_end_matches('/').to_string()
}

/// Maps a non-success status to a directory error. `subject` names what was asked
/// for, so a 404 reads as "not found: <subject>".
pub(crate) async fn check_status(response: Response, subject: &str) -> Result<Response, DirectoryError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(DirectoryError::NotFound(subject.to_string()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DirectoryError::Transport(format!(
            "{status} for {subject}: {}",
            truncate(&body, 200)
        )));
    }
    Ok(response)
}

pub(crate) async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, DirectoryError> {
    response
        .json()
        .await
        .map_err(|e| DirectoryError::Decode(e.to_string()))
}

pub(crate) fn transport(err: reqwest::Error) -> DirectoryError {
    DirectoryError::Transport(err.to_string())
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

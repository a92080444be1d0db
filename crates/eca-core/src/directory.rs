//! Collaborator boundaries for the identity, project and bot directories.

use crate::types::{BotUser, Identity, Project};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl DirectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::NotFound(_))
    }
}

/// Resolves a commit mail address to registered accounts.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Accounts registered under `mail`. Callers use the first result.
    async fn lookup(&self, mail: &str) -> Result<Vec<Identity>, DirectoryError>;
}

#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Every project, in directory order.
    async fn list_all(&self) -> Result<Vec<Project>, DirectoryError>;

    /// Projects hosting `repo_url` in any of their repo lists.
    async fn list_by_repo(&self, repo_url: &str) -> Result<Vec<Project>, DirectoryError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|project| {
                project
                    .repos
                    .iter()
                    .chain(&project.github_repos)
                    .chain(&project.gitlab_repos)
                    .any(|url| url == repo_url)
            })
            .collect())
    }
}

#[async_trait]
pub trait BotDirectory: Send + Sync {
    async fn list_all(&self) -> Result<Vec<BotUser>, DirectoryError>;
}

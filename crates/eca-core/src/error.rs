use thiserror::Error;

/// Errors raised by the decision engine itself.
///
/// Commit-level failures are never errors in this sense: they are recorded in the
/// [`ValidationResponse`](crate::ValidationResponse) and the batch continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcaError {
    #[error("A commit is required to validate")]
    MissingCommits,

    #[error("A base repo URL needs to be set in order to validate")]
    MissingRepoUrl,

    #[error("A provider needs to be set to validate a request")]
    MissingProvider,

    #[error("unknown status code {0}")]
    UnknownStatusCode(i32),
}

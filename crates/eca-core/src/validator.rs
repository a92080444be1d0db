use crate::cache::CacheLayer;
use crate::checker::CommitChecker;
use crate::classifier::AccessClassifier;
use crate::directory::{BotDirectory, DirectoryError, IdentityDirectory, ProjectDirectory};
use crate::response::{ApiStatusCode, ValidationResponse};
use crate::types::{mail_matches, Commit, GitIdentity, Identity, Provider, ValidationRequest};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// What happens to the rest of a batch after a structurally invalid commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidCommitPolicy {
    /// Record the error and keep going.
    #[default]
    Skip,
    /// Record the error and stop processing the batch.
    Abort,
}

/// Treatment of commits with more than one parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeCommitPolicy {
    #[default]
    Validate,
    /// Pass merge commits without identity or access checks.
    Pass,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    pub invalid_commit: InvalidCommitPolicy,
    pub merge_commits: MergeCommitPolicy,
}

/// Runs a validation request end to end.
pub struct RequestValidator {
    cache: Arc<CacheLayer>,
    identities: Arc<dyn IdentityDirectory>,
    classifier: AccessClassifier,
    policy: ValidationPolicy,
}

impl RequestValidator {
    pub fn new(
        cache: Arc<CacheLayer>,
        identities: Arc<dyn IdentityDirectory>,
        projects: Arc<dyn ProjectDirectory>,
        bots: Arc<dyn BotDirectory>,
        policy: ValidationPolicy,
    ) -> Self {
        let classifier = AccessClassifier::new(Arc::clone(&cache), projects, bots);
        Self {
            cache,
            identities,
            classifier,
            policy,
        }
    }

    pub fn classifier(&self) -> &AccessClassifier {
        &self.classifier
    }

    pub fn cache(&self) -> &Arc<CacheLayer> {
        &self.cache
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Validates every commit in `request`.
    ///
    /// A malformed request yields a single error under the nil bucket. Otherwise
    /// commits are checked in order and each failure is recorded against its own
    /// hash.
    #[instrument(
        skip_all,
        fields(request_id = %Uuid::new_v4(), repo_url = ?request.repo_url, provider = ?request.provider)
    )]
    pub async fn validate(&self, request: &ValidationRequest) -> ValidationResponse {
        let mut response = ValidationResponse::new();

        let (repo_url, provider) = match request.target() {
            Ok(target) => target,
            Err(err) => {
                reject(&mut response, None, err.to_string(), ApiStatusCode::ErrorDefault);
                return response;
            }
        };

        let tracked = !self
            .classifier
            .projects_for_repo(repo_url, provider)
            .await
            .is_empty();
        response.set_tracked_project(tracked);

        for commit in request.commits() {
            let flow = self
                .process_commit(&mut response, commit, repo_url, provider)
                .await;
            if flow.is_break() {
                break;
            }
        }

        info!(
            passed = response.passed(),
            error_count = response.error_count(),
            tracked_project = tracked,
            "validation complete"
        );
        response
    }

    async fn process_commit(
        &self,
        response: &mut ValidationResponse,
        commit: Option<&Commit>,
        repo_url: &str,
        provider: Provider,
    ) -> ControlFlow<()> {
        let checked = commit
            .filter(|commit| CommitChecker::validate(Some(*commit)))
            .and_then(|commit| {
                Some((
                    commit,
                    commit.hash()?,
                    commit.author.as_ref()?,
                    commit.committer.as_ref()?,
                ))
            });
        let Some((commit, hash, author, committer)) = checked else {
            reject(
                response,
                commit.and_then(Commit::hash),
                "One or more commits were invalid. Please check the payload and try again",
                ApiStatusCode::ErrorDefault,
            );
            return match self.policy.invalid_commit {
                InvalidCommitPolicy::Skip => ControlFlow::Continue(()),
                InvalidCommitPolicy::Abort => ControlFlow::Break(()),
            };
        };

        note(
            response,
            Some(hash),
            format!("Reviewing commit: {hash}"),
            ApiStatusCode::SuccessDefault,
        );
        note(
            response,
            Some(hash),
            format!("Authored by: {} <{}>", author.name(), author.mail()),
            ApiStatusCode::SuccessDefault,
        );

        if commit.is_merge() && self.policy.merge_commits == MergeCommitPolicy::Pass {
            note(
                response,
                Some(hash),
                format!("Commit '{hash}' has multiple parents, merge commit detected, passing"),
                ApiStatusCode::SuccessDefault,
            );
            return ControlFlow::Continue(());
        }

        let Some(author_identity) = self
            .resolve_account(response, Some(hash), author, "author")
            .await
        else {
            reject(
                response,
                Some(hash),
                "Author must have a registered account",
                ApiStatusCode::ErrorDefault,
            );
            return ControlFlow::Continue(());
        };
        let Some(committer_identity) = self
            .resolve_account(response, Some(hash), committer, "committer")
            .await
        else {
            reject(
                response,
                Some(hash),
                "Committing user must have a registered account",
                ApiStatusCode::ErrorDefault,
            );
            return ControlFlow::Continue(());
        };

        self.validate_author_access(
            response,
            commit,
            Some(hash),
            &author_identity,
            repo_url,
            provider,
        )
        .await;

        // Only committers may push on behalf of someone else.
        if author_identity != committer_identity
            && !self
                .classifier
                .is_committer(response, Some(hash), &committer_identity, repo_url, provider)
                .await
        {
            note(
                response,
                Some(hash),
                "You are not a project committer.",
                ApiStatusCode::SuccessDefault,
            );
            note(
                response,
                Some(hash),
                "Only project committers can push on behalf of others.",
                ApiStatusCode::SuccessDefault,
            );
            reject(
                response,
                Some(hash),
                "You must be a committer to push on behalf of others.",
                ApiStatusCode::ErrorDefault,
            );
        }
        ControlFlow::Continue(())
    }

    async fn validate_author_access(
        &self,
        response: &mut ValidationResponse,
        commit: &Commit,
        hash: Option<&str>,
        author: &Identity,
        repo_url: &str,
        provider: Provider,
    ) {
        if self
            .classifier
            .is_committer(response, hash, author, repo_url, provider)
            .await
        {
            note(
                response,
                hash,
                "The author is a committer on the project.",
                ApiStatusCode::SuccessCommitter,
            );
            return;
        }
        note(
            response,
            hash,
            "The author is not a committer on the project.",
            ApiStatusCode::SuccessDefault,
        );

        if author.agreement.signed {
            note(
                response,
                hash,
                "The author has a current Contributor Agreement (ECA) on file.",
                ApiStatusCode::SuccessDefault,
            );
        } else {
            note(
                response,
                hash,
                "The author does not have a current Contributor Agreement (ECA) on file.\n\
                 If there are multiple commits, please ensure that each author has a ECA.",
                ApiStatusCode::SuccessDefault,
            );
            reject(
                response,
                hash,
                "A signed Contributor Agreement (ECA) is required.",
                ApiStatusCode::ErrorDefault,
            );
        }

        let signed_off = CommitChecker::extract_sign_off(Some(commit))
            .is_some_and(|mail| mail_matches(mail, &author.mail));
        if signed_off {
            note(
                response,
                hash,
                "The author has \"signed-off\" on the contribution.",
                ApiStatusCode::SuccessContributor,
            );
        } else {
            note(
                response,
                hash,
                "The author has not \"signed-off\" on the contribution.\n\
                 If there are multiple commits, please ensure that each commit is signed-off.",
                ApiStatusCode::SuccessDefault,
            );
            reject(
                response,
                hash,
                "The contributor must \"sign-off\" on the contribution.",
                ApiStatusCode::ErrorSignOff,
            );
        }
    }

    /// Resolves the account behind a commit identity, noting the mail when none is
    /// found.
    async fn resolve_account(
        &self,
        response: &mut ValidationResponse,
        hash: Option<&str>,
        user: &GitIdentity,
        role: &str,
    ) -> Option<Identity> {
        let mail = user.mail();
        let identity = self.lookup_identity(mail).await;
        if identity.is_none() {
            note(
                response,
                hash,
                format!(
                    "Could not find an account with mail '{mail}' for {role} of commit {}",
                    hash.unwrap_or_default()
                ),
                ApiStatusCode::SuccessDefault,
            );
        }
        identity
    }

    /// Cached directory lookup. A directory 404 is cached as "no account"; other
    /// faults are logged by the cache and not stored.
    pub async fn lookup_identity(&self, mail: &str) -> Option<Identity> {
        let identities: Option<Vec<Identity>> = self
            .cache
            .get(mail, || async {
                match self.identities.lookup(mail).await {
                    Err(DirectoryError::NotFound(_)) => {
                        debug!(mail, "no account registered for mail");
                        Ok(Vec::new())
                    }
                    other => other,
                }
            })
            .await;
        identities.and_then(|identities| identities.into_iter().next())
    }
}

fn note(
    response: &mut ValidationResponse,
    hash: Option<&str>,
    message: impl Into<String>,
    code: ApiStatusCode,
) {
    let message = message.into();
    debug!(hash = hash.unwrap_or_default(), "{message}");
    response.add_message(hash, message, code);
}

fn reject(
    response: &mut ValidationResponse,
    hash: Option<&str>,
    message: impl Into<String>,
    code: ApiStatusCode,
) {
    let message = message.into();
    warn!(hash = hash.unwrap_or_default(), code = code.value(), "{message}");
    response.add_error(hash, message, code);
}

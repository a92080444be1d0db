use crate::cache::CacheLayer;
use crate::directory::{BotDirectory, ProjectDirectory};
use crate::response::{ApiStatusCode, ValidationResponse};
use crate::types::{mail_matches, BotUser, Identity, Project, Provider};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache key of the full project and bot listings.
pub const ALL_ENTRIES_KEY: &str = "all";

/// How an identity relates to the projects hosting a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitterAccess {
    /// Listed as a committer on the project.
    Committer { project_id: String },
    /// A bot account registered for the project.
    Bot { project_id: String },
    /// Committer on a specification project without the rights to modify one.
    SpecProjectDenied {
        project_id: String,
        working_group: String,
    },
    None,
}

impl CommitterAccess {
    pub fn grants(&self) -> bool {
        matches!(
            self,
            CommitterAccess::Committer { .. } | CommitterAccess::Bot { .. }
        )
    }
}

/// Decides committer standing from the cached project and bot directories.
pub struct AccessClassifier {
    cache: Arc<CacheLayer>,
    projects: Arc<dyn ProjectDirectory>,
    bots: Arc<dyn BotDirectory>,
}

impl AccessClassifier {
    pub fn new(
        cache: Arc<CacheLayer>,
        projects: Arc<dyn ProjectDirectory>,
        bots: Arc<dyn BotDirectory>,
    ) -> Self {
        Self {
            cache,
            projects,
            bots,
        }
    }

    /// Loads the project listing into the cache. Returns the number of projects, or
    /// `None` when the directory could not be reached.
    pub async fn warm_up(&self) -> Option<usize> {
        self.all_projects().await.map(|projects| projects.len())
    }

    async fn all_projects(&self) -> Option<Vec<Project>> {
        self.cache
            .get(ALL_ENTRIES_KEY, || async { self.projects.list_all().await })
            .await
    }

    async fn all_bots(&self) -> Vec<BotUser> {
        self.cache
            .get(ALL_ENTRIES_KEY, || async { self.bots.list_all().await })
            .await
            .unwrap_or_default()
    }

    /// Projects whose repo list for `provider` contains `repo_url`, in directory order.
    pub async fn projects_for_repo(&self, repo_url: &str, provider: Provider) -> Vec<Project> {
        self.all_projects()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|project| project.hosts_repo(provider, repo_url))
            .collect()
    }

    /// Walks the candidate projects in order. The first committer listing decides the
    /// outcome, including a specification-project denial; bots are matched per
    /// project by mail.
    pub async fn classify(
        &self,
        identity: &Identity,
        repo_url: &str,
        provider: Provider,
    ) -> CommitterAccess {
        let mut bots: Option<Vec<BotUser>> = None;

        for project in self.projects_for_repo(repo_url, provider).await {
            debug!(project = %project.name, user = %identity.name, "checking project");

            if project.has_committer(&identity.name) {
                if let Some(working_group) = &project.spec_working_group {
                    if !identity.agreement.can_contribute_spec_project {
                        return CommitterAccess::SpecProjectDenied {
                            project_id: project.id,
                            working_group: working_group.clone(),
                        };
                    }
                }
                debug!(mail = %identity.mail, project = %project.name, "user is a committer");
                return CommitterAccess::Committer {
                    project_id: project.id,
                };
            }

            if bots.is_none() {
                bots = Some(self.all_bots().await);
            }
            let is_bot = bots.iter().flatten().any(|bot| {
                bot.project_id == project.id && mail_matches(&bot.mail, &identity.mail)
            });
            if is_bot {
                debug!(user = %identity.name, project = %project.name, "user is a bot");
                return CommitterAccess::Bot {
                    project_id: project.id,
                };
            }
        }

        CommitterAccess::None
    }

    /// Whether `identity` may commit to the repository. A specification-project
    /// denial is recorded as an error against `hash`.
    pub async fn is_committer(
        &self,
        response: &mut ValidationResponse,
        hash: Option<&str>,
        identity: &Identity,
        repo_url: &str,
        provider: Provider,
    ) -> bool {
        match self.classify(identity, repo_url, provider).await {
            CommitterAccess::SpecProjectDenied { working_group, .. } => {
                let message = format!(
                    "Project is a specification for the working group '{working_group}', but user does not have permission to modify a specification project"
                );
                warn!(user = %identity.name, "{message}");
                response.add_error(hash, message, ApiStatusCode::ErrorSpecProject);
                false
            }
            access => access.grants(),
        }
    }
}

use crate::{check_status, decode, normalize_base, transport};
use async_trait::async_trait;
use eca_core::{DirectoryError, Project, ProjectDirectory};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_PAGES: u32 = 1_000;

#[derive(Debug, Deserialize)]
struct ProjectRecord {
    #[serde(alias = "projectId")]
    project_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    committers: Vec<CommitterRecord>,
    #[serde(default)]
    repos: Vec<RepoRecord>,
    #[serde(default)]
    github_repos: Vec<RepoRecord>,
    #[serde(default)]
    gitlab_repos: Vec<RepoRecord>,
    /// An object carrying an `id` when set, an empty array when not.
    #[serde(default)]
    spec_project_working_group: Value,
}

#[derive(Debug, Deserialize)]
struct CommitterRecord {
    username: String,
}

#[derive(Debug, Deserialize)]
struct RepoRecord {
    url: String,
}

fn urls(repos: Vec<RepoRecord>) -> Vec<String> {
    repos.into_iter().map(|repo| repo.url).collect()
}

impl From<ProjectRecord> for Project {
    fn from(record: ProjectRecord) -> Self {
        let spec_working_group = record
            .spec_project_working_group
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string);
        Project {
            id: record.project_id,
            name: record.name,
            committers: record
                .committers
                .into_iter()
                .map(|committer| committer.username)
                .collect(),
            repos: urls(record.repos),
            github_repos: urls(record.github_repos),
            gitlab_repos: urls(record.gitlab_repos),
            spec_working_group,
        }
    }
}

/// Client for `{base}/api/projects`. The full listing is paged until an empty page
/// comes back.
pub struct ProjectsClient {
    http: Client,
    base_url: String,
    page_size: u32,
}

impl ProjectsClient {
    pub fn new(http: Client, base_url: impl Into<String>, page_size: u32) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
            page_size: page_size.max(1),
        }
    }

    async fn fetch(&self, query: &[(&str, String)]) -> Result<Vec<Project>, DirectoryError> {
        let url = format!("{}/api/projects", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response, "projects").await?;
        let records: Vec<ProjectRecord> = decode(response).await?;
        Ok(records.into_iter().map(Project::from).collect())
    }
}

#[async_trait]
impl ProjectDirectory for ProjectsClient {
    async fn list_all(&self) -> Result<Vec<Project>, DirectoryError> {
        let mut projects = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch = self
                .fetch(&[
                    ("page", page.to_string()),
                    ("pagesize", self.page_size.to_string()),
                ])
                .await?;
            if batch.is_empty() {
                debug!(pages = page - 1, count = projects.len(), "loaded project listing");
                return Ok(projects);
            }
            projects.extend(batch);
        }
        warn!(max_pages = MAX_PAGES, "project listing did not terminate, truncating");
        Ok(projects)
    }

    async fn list_by_repo(&self, repo_url: &str) -> Result<Vec<Project>, DirectoryError> {
        self.fetch(&[("repoUrl", repo_url.to_string())]).await
    }
}

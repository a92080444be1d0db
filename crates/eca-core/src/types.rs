use crate::error::EcaError;
use serde::{Deserialize, Serialize};

/// Mail addresses compare without regard to case.
pub(crate) fn mail_matches(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}

/// Name and mail as recorded in a git commit header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitIdentity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
}

impl GitIdentity {
    pub fn new(name: impl Into<String>, mail: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            mail: Some(mail.into()),
        }
    }

    pub fn mail(&self) -> &str {
        self.mail.as_deref().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

/// A single commit submitted for validation.
///
/// Every field is optional on the wire; [`CommitChecker::validate`](crate::CommitChecker::validate)
/// decides whether the commit carries enough to be checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Commit {
    pub hash: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub parents: Vec<String>,
    pub author: Option<GitIdentity>,
    pub committer: Option<GitIdentity>,
    pub head: bool,
}

impl Commit {
    pub fn new(hash: impl Into<String>, author: GitIdentity, committer: GitIdentity) -> Self {
        Self {
            hash: Some(hash.into()),
            author: Some(author),
            committer: Some(committer),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref().filter(|hash| !hash.is_empty())
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Agreement state attached to a resolved account. Both flags stay `false` until the
/// directory says otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Agreement {
    pub signed: bool,
    pub can_contribute_spec_project: bool,
}

impl Agreement {
    pub fn new(signed: bool, can_contribute_spec_project: bool) -> Self {
        Self {
            signed,
            can_contribute_spec_project,
        }
    }
}

/// An account resolved from the identity directory.
///
/// `name` is the account username, which is what project committer lists refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(alias = "uid")]
    pub id: u64,
    pub name: String,
    pub mail: String,
    #[serde(default, rename = "eca")]
    pub agreement: Agreement,
    #[serde(default, alias = "committer")]
    pub is_committer: bool,
}

impl Identity {
    pub fn new(id: u64, name: impl Into<String>, mail: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mail: mail.into(),
            ..Self::default()
        }
    }

    pub fn with_agreement(mut self, agreement: Agreement) -> Self {
        self.agreement = agreement;
        self
    }

    pub fn with_committer_flag(mut self, is_committer: bool) -> Self {
        self.is_committer = is_committer;
        self
    }
}

/// A project from the project directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Usernames holding committer rights, in directory order.
    #[serde(default)]
    pub committers: Vec<String>,
    #[serde(default)]
    pub repos: Vec<String>,
    #[serde(default)]
    pub github_repos: Vec<String>,
    #[serde(default)]
    pub gitlab_repos: Vec<String>,
    /// Set when the project is a specification project of a working group.
    #[serde(default)]
    pub spec_working_group: Option<String>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn has_committer(&self, username: &str) -> bool {
        self.committers.iter().any(|committer| committer == username)
    }

    /// Whether the repo list selected by `provider` contains `repo_url`.
    pub fn hosts_repo(&self, provider: Provider, repo_url: &str) -> bool {
        (provider.repo_list())(self)
            .iter()
            .any(|url| url == repo_url)
    }

    pub fn is_spec_project(&self) -> bool {
        self.spec_working_group.is_some()
    }
}

/// A bot account granted committer-equivalent standing on exactly one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotUser {
    pub id: String,
    pub username: String,
    #[serde(alias = "email")]
    pub mail: String,
    pub project_id: String,
}

/// Hosting platform of the repository being pushed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Generic,
    Github,
    Gitlab,
    Gerrit,
}

/// Accessor for one of a project's repo URL lists.
pub type RepoList = fn(&Project) -> &[String];

fn generic_repos(project: &Project) -> &[String] {
    &project.repos
}

fn github_repos(project: &Project) -> &[String] {
    &project.github_repos
}

fn gitlab_repos(project: &Project) -> &[String] {
    &project.gitlab_repos
}

impl Provider {
    /// Repo list consulted for this provider. Gerrit-hosted repos live in the
    /// generic list.
    pub fn repo_list(self) -> RepoList {
        match self {
            Provider::Github => github_repos,
            Provider::Gitlab => gitlab_repos,
            Provider::Generic | Provider::Gerrit => generic_repos,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Generic => "generic",
            Provider::Github => "github",
            Provider::Gitlab => "gitlab",
            Provider::Gerrit => "gerrit",
        }
    }
}

/// Inbound validation request.
///
/// `commits` entries may be JSON `null`; such entries fail structural validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    #[serde(default, alias = "repoUrl")]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub provider: Option<Provider>,
    #[serde(default)]
    pub commits: Option<Vec<Option<Commit>>>,
}

impl ValidationRequest {
    pub fn new(repo_url: impl Into<String>, provider: Provider, commits: Vec<Commit>) -> Self {
        Self {
            repo_url: Some(repo_url.into()),
            provider: Some(provider),
            commits: Some(commits.into_iter().map(Some).collect()),
        }
    }

    /// Shape check: a non-empty commit list, a repo URL and a provider.
    pub fn target(&self) -> Result<(&str, Provider), EcaError> {
        if self.commits.as_ref().map_or(true, Vec::is_empty) {
            return Err(EcaError::MissingCommits);
        }
        let repo_url = self.repo_url.as_deref().ok_or(EcaError::MissingRepoUrl)?;
        let provider = self.provider.ok_or(EcaError::MissingProvider)?;
        Ok((repo_url, provider))
    }

    pub fn commits(&self) -> impl Iterator<Item = Option<&Commit>> {
        self.commits
            .iter()
            .flatten()
            .map(|commit| commit.as_ref())
    }
}

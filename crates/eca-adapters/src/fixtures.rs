//! Fixed sample directory used by `directory.mode = "fixture"` and in tests.

use async_trait::async_trait;
use eca_core::{
    AccessToken, Agreement, BotDirectory, BotUser, DirectoryError, Identity, IdentityDirectory,
    Project, ProjectDirectory, TokenError, TokenProvider,
};
use std::time::Duration;

/// Sample accounts, projects and bots.
///
/// Accounts: `newbie@important.co` has no agreement; `code.wiz@important.co` and
/// `grunt@important.co` are committers, only the former with spec rights. Projects:
/// `sample.proj`, `sample.proto` and the specification project `spec.proj`
/// (working group `proj1`), all on `http://www.github.com/eclipsefdn/...`.
#[derive(Debug, Clone)]
pub struct FixtureDirectory {
    accounts: Vec<Identity>,
    projects: Vec<Project>,
    bots: Vec<BotUser>,
}

impl Default for FixtureDirectory {
    fn default() -> Self {
        Self::sample()
    }
}

fn account(id: u64, name: &str, mail: &str, committer: bool, agreement: Agreement) -> Identity {
    Identity::new(id, name, mail)
        .with_agreement(agreement)
        .with_committer_flag(committer)
}

fn project(id: &str, name: &str, repos: &[&str], committers: &[&str], working_group: Option<&str>) -> Project {
    Project {
        github_repos: repos.iter().map(|repo| repo.to_string()).collect(),
        committers: committers.iter().map(|c| c.to_string()).collect(),
        spec_working_group: working_group.map(str::to_string),
        ..Project::new(id, name)
    }
}

fn bot(id: &str, username: &str, project_id: &str) -> BotUser {
    BotUser {
        id: id.to_string(),
        username: username.to_string(),
        mail: format!("{id}.bot@eclipse.org"),
        project_id: project_id.to_string(),
    }
}

impl FixtureDirectory {
    pub fn sample() -> Self {
        let accounts = vec![
            account(1, "newbieAnon", "newbie@important.co", false, Agreement::default()),
            account(2, "barshall_blathers", "slom@eclipse-foundation.org", false, Agreement::new(true, true)),
            account(3, "mctesterson", "tester@eclipse-foundation.org", false, Agreement::new(true, false)),
            account(4, "da_wizz", "code.wiz@important.co", true, Agreement::new(true, true)),
            account(5, "grunter", "grunt@important.co", true, Agreement::new(true, false)),
            account(6, "sumAnalyst", "paper.pusher@important.co", false, Agreement::new(true, false)),
        ];
        let projects = vec![
            project(
                "sample.proj",
                "Sample project",
                &[
                    "http://www.github.com/eclipsefdn/sample",
                    "http://www.github.com/eclipsefdn/test",
                ],
                &["da_wizz", "grunter"],
                None,
            ),
            project(
                "sample.proto",
                "Prototype thing",
                &["http://www.github.com/eclipsefdn/prototype"],
                &["grunter"],
                None,
            ),
            project(
                "spec.proj",
                "Spec project",
                &["http://www.github.com/eclipsefdn/tck-proto"],
                &["da_wizz", "grunter"],
                Some("proj1"),
            ),
        ];
        let bots = vec![
            bot("1", "sample-bot", "sample.proj"),
            bot("2", "proto-bot", "sample.proto"),
            bot("3", "spec-bot", "spec.proj"),
        ];
        Self {
            accounts,
            projects,
            bots,
        }
    }
}

#[async_trait]
impl IdentityDirectory for FixtureDirectory {
    async fn lookup(&self, mail: &str) -> Result<Vec<Identity>, DirectoryError> {
        let found: Vec<Identity> = self
            .accounts
            .iter()
            .filter(|account| account.mail == mail)
            .cloned()
            .collect();
        if found.is_empty() {
            return Err(DirectoryError::NotFound(mail.to_string()));
        }
        Ok(found)
    }
}

#[async_trait]
impl ProjectDirectory for FixtureDirectory {
    async fn list_all(&self) -> Result<Vec<Project>, DirectoryError> {
        Ok(self.projects.clone())
    }
}

#[async_trait]
impl BotDirectory for FixtureDirectory {
    async fn list_all(&self) -> Result<Vec<BotUser>, DirectoryError> {
        Ok(self.bots.clone())
    }
}

/// Hands out a fixed token that never needs refreshing within a run.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn exchange(&self) -> Result<AccessToken, TokenError> {
        Ok(AccessToken {
            value: self.token.clone(),
            expires_in: Duration::from_secs(24 * 60 * 60),
        })
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use eca_core::{
    Agreement, BotDirectory, BotUser, CacheLayer, Commit, DirectoryError, GitIdentity, Identity,
    IdentityDirectory, Project, ProjectDirectory, Provider, RequestValidator, ValidationPolicy,
    ValidationRequest,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const SAMPLE_REPO: &str = "http://www.github.com/eclipsefdn/sample";
pub const PROTOTYPE_REPO: &str = "http://www.github.com/eclipsefdn/prototype";
pub const SPEC_REPO: &str = "http://www.github.com/eclipsefdn/tck-proto";
pub const PARENT: &str = "46bb69bf6aa4ed26b2bf8c322ae05bef0bcc5c10";

pub struct Accounts {
    accounts: Vec<Identity>,
    pub lookups: AtomicUsize,
}

impl Accounts {
    pub fn sample() -> Self {
        let account = |id, name: &str, mail: &str, committer, signed, spec| {
            Identity::new(id, name, mail)
                .with_agreement(Agreement::new(signed, spec))
                .with_committer_flag(committer)
        };
        Self {
            accounts: vec![
                account(1, "newbieAnon", "newbie@important.co", false, false, false),
                account(2, "barshall_blathers", "slom@eclipse-foundation.org", false, true, true),
                account(3, "mctesterson", "tester@eclipse-foundation.org", false, true, false),
                account(4, "da_wizz", "code.wiz@important.co", true, true, true),
                account(5, "grunter", "grunt@important.co", true, true, false),
                account(6, "sumAnalyst", "paper.pusher@important.co", false, true, false),
            ],
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn with_account(mut self, account: Identity) -> Self {
        self.accounts.push(account);
        self
    }
}

#[async_trait]
impl IdentityDirectory for Accounts {
    async fn lookup(&self, mail: &str) -> Result<Vec<Identity>, DirectoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
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

pub struct Projects(pub Vec<Project>);

impl Projects {
    pub fn sample() -> Self {
        let project = |id: &str, name: &str, repos: &[&str], committers: &[&str], wg: Option<&str>| Project {
            github_repos: repos.iter().map(|r| r.to_string()).collect(),
            committers: committers.iter().map(|c| c.to_string()).collect(),
            spec_working_group: wg.map(str::to_string),
            ..Project::new(id, name)
        };
        Self(vec![
            project(
                "sample.proj",
                "Sample project",
                &[SAMPLE_REPO, "http://www.github.com/eclipsefdn/test"],
                &["da_wizz", "grunter"],
                None,
            ),
            project("sample.proto", "Prototype thing", &[PROTOTYPE_REPO], &["grunter"], None),
            project("spec.proj", "Spec project", &[SPEC_REPO], &["da_wizz", "grunter"], Some("proj1")),
        ])
    }
}

#[async_trait]
impl ProjectDirectory for Projects {
    async fn list_all(&self) -> Result<Vec<Project>, DirectoryError> {
        Ok(self.0.clone())
    }
}

pub struct Bots(pub Vec<BotUser>);

impl Bots {
    pub fn sample() -> Self {
        let bot = |id: &str, project_id: &str| BotUser {
            id: id.to_string(),
            username: format!("{project_id}-bot"),
            mail: format!("{id}.bot@eclipse.org"),
            project_id: project_id.to_string(),
        };
        Self(vec![
            bot("1", "sample.proj"),
            bot("2", "sample.proto"),
            bot("3", "spec.proj"),
        ])
    }
}

#[async_trait]
impl BotDirectory for Bots {
    async fn list_all(&self) -> Result<Vec<BotUser>, DirectoryError> {
        Ok(self.0.clone())
    }
}

pub fn validator(policy: ValidationPolicy) -> RequestValidator {
    validator_with(Arc::new(Accounts::sample()), Projects::sample(), policy)
}

pub fn validator_with(
    accounts: Arc<Accounts>,
    projects: Projects,
    policy: ValidationPolicy,
) -> RequestValidator {
    RequestValidator::new(
        Arc::new(CacheLayer::default()),
        accounts,
        Arc::new(projects),
        Arc::new(Bots::sample()),
        policy,
    )
}

pub fn user(name: &str, mail: &str) -> GitIdentity {
    GitIdentity::new(name, mail)
}

pub fn signed_off(hash: &str, author: &GitIdentity, committer: &GitIdentity, sign_off: &str) -> Commit {
    Commit::new(hash, author.clone(), committer.clone())
        .with_subject("All of the things")
        .with_body(format!("Signed-off-by: {} <{}>", author.name(), sign_off))
}

pub fn request(repo_url: &str, commits: Vec<Commit>) -> ValidationRequest {
    ValidationRequest::new(repo_url, Provider::Github, commits)
}

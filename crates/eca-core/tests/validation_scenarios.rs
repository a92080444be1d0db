mod common;

use common::*;
use eca_core::{
    ApiStatusCode, Commit, Identity, InvalidCommitPolicy, MergeCommitPolicy, Project, Provider,
    ValidationPolicy, ValidationRequest, ValidationResponse, NIL_HASH_KEY,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;

const HASH: &str = "123456789abcdefghijklmnop";

fn wizard() -> eca_core::GitIdentity {
    user("The Wizard", "code.wiz@important.co")
}

fn grunt() -> eca_core::GitIdentity {
    user("Grunts McGee", "grunt@important.co")
}

fn barshall() -> eca_core::GitIdentity {
    user("Barshall Blathers", "slom@eclipse-foundation.org")
}

fn newbie() -> eca_core::GitIdentity {
    user("Newbie Anon", "newbie@important.co")
}

fn error_codes(response: &ValidationResponse, hash: &str) -> Vec<ApiStatusCode> {
    response
        .commit(hash)
        .map(|status| status.errors.iter().map(|error| error.code).collect())
        .unwrap_or_default()
}

async fn run(request: ValidationRequest) -> ValidationResponse {
    validator(ValidationPolicy::default()).validate(&request).await
}

#[tokio::test]
async fn committer_with_sign_off_passes() {
    let wizard = wizard();
    let commit = signed_off(HASH, &wizard, &wizard, wizard.mail());

    let response = run(request(SAMPLE_REPO, vec![commit])).await;

    assert!(response.passed());
    assert_eq!(response.error_count(), 0);
    assert!(response.tracked_project());
    assert_eq!(response.status(), ApiStatusCode::SuccessCommitter);
    let messages = &response.commit(HASH).unwrap().messages;
    assert_eq!(messages[0].message, format!("Reviewing commit: {HASH}"));
    assert_eq!(messages[1].message, "Authored by: The Wizard <code.wiz@important.co>");
}

#[tokio::test]
async fn multiple_committer_commits_pass() {
    let (wizard, grunt) = (wizard(), grunt());
    let first = signed_off(HASH, &wizard, &wizard, wizard.mail());
    let second = Commit::new("123456789abcdefghijklmnop2", grunt.clone(), grunt.clone())
        .with_body("Signed-off-by: Grunts McGee<grunt@important.co>")
        .with_parents([HASH]);

    let response = run(request(SAMPLE_REPO, vec![first, second])).await;

    assert!(response.passed());
    assert_eq!(response.commits().len(), 2);
}

#[tokio::test]
async fn committer_needs_no_sign_off() {
    let grunt = grunt();
    let commit = Commit::new(HASH, grunt.clone(), grunt).with_body("");

    let response = run(request(PROTOTYPE_REPO, vec![commit])).await;

    assert!(response.passed());
}

#[tokio::test]
async fn missing_agreement_and_sign_off_both_fail() {
    let newbie = newbie();
    let commit = Commit::new(HASH, newbie.clone(), newbie);

    let response = run(request(SAMPLE_REPO, vec![commit])).await;

    assert!(!response.passed());
    assert_eq!(response.error_count(), 2);
    assert_eq!(
        error_codes(&response, HASH),
        vec![ApiStatusCode::ErrorDefault, ApiStatusCode::ErrorSignOff]
    );
    assert_eq!(response.status(), ApiStatusCode::ErrorSignOff);
}

#[tokio::test]
async fn non_committer_without_sign_off_fails_on_sign_off_only() {
    // Committer on the sample project but not on the prototype.
    let wizard = wizard();
    let commit = Commit::new(HASH, wizard.clone(), wizard).with_body("");

    let response = run(request(PROTOTYPE_REPO, vec![commit])).await;

    assert!(!response.passed());
    assert_eq!(response.error_count(), 1);
    assert_eq!(error_codes(&response, HASH), vec![ApiStatusCode::ErrorSignOff]);
}

#[tokio::test]
async fn mismatched_sign_off_fails() {
    let barshall = barshall();
    let commit = signed_off(HASH, &barshall, &barshall, "barshallb@personal.co");

    let response = run(request(PROTOTYPE_REPO, vec![commit])).await;

    assert!(!response.passed());
    assert_eq!(response.error_count(), 1);
    assert_eq!(error_codes(&response, HASH), vec![ApiStatusCode::ErrorSignOff]);
}

#[tokio::test]
async fn sign_off_mail_matches_case_insensitively() {
    let barshall = barshall();
    let commit = signed_off(HASH, &barshall, &barshall, "SLOM@Eclipse-Foundation.org");

    let response = run(request(PROTOTYPE_REPO, vec![commit])).await;

    assert!(response.passed());
    let messages = &response.commit(HASH).unwrap().messages;
    assert!(messages
        .iter()
        .any(|m| m.code == ApiStatusCode::SuccessContributor));
}

#[tokio::test]
async fn agreement_required_even_with_sign_off() {
    let newbie = newbie();
    let commit = signed_off(HASH, &newbie, &newbie, newbie.mail()).with_parents([PARENT]);

    let response = run(request(SAMPLE_REPO, vec![commit])).await;

    assert!(!response.passed());
    assert_eq!(error_codes(&response, HASH), vec![ApiStatusCode::ErrorDefault]);
}

#[tokio::test]
async fn proxy_push_by_committer_passes() {
    let (wizard, barshall) = (wizard(), barshall());
    let commit = signed_off(HASH, &barshall, &wizard, barshall.mail());

    let response = run(request(SPEC_REPO, vec![commit])).await;

    assert!(response.passed());
}

#[tokio::test]
async fn proxy_push_by_non_committer_fails() {
    let (wizard, barshall) = (wizard(), barshall());
    let commit = signed_off(HASH, &barshall, &wizard, barshall.mail()).with_parents([PARENT]);

    let response = run(request(PROTOTYPE_REPO, vec![commit])).await;

    assert!(!response.passed());
    assert_eq!(response.error_count(), 1);
    let errors = &response.commit(HASH).unwrap().errors;
    assert_eq!(errors[0].message, "You must be a committer to push on behalf of others.");
}

#[tokio::test]
async fn proxy_push_result_follows_author_checks() {
    // The committer has standing, so only the author's own failures count.
    let (newbie, grunt) = (newbie(), grunt());
    let commit = Commit::new(HASH, newbie, grunt);

    let response = run(request(PROTOTYPE_REPO, vec![commit])).await;

    assert!(!response.passed());
    assert_eq!(
        error_codes(&response, HASH),
        vec![ApiStatusCode::ErrorDefault, ApiStatusCode::ErrorSignOff]
    );
    let errors = &response.commit(HASH).unwrap().errors;
    assert!(errors
        .iter()
        .all(|e| !e.message.contains("on behalf of others")));
}

#[tokio::test]
async fn spec_project_requires_spec_rights() {
    let wizard = wizard();
    let allowed = signed_off(HASH, &wizard, &wizard, wizard.mail());
    assert!(run(request(SPEC_REPO, vec![allowed])).await.passed());

    let grunt = grunt();
    let denied = signed_off(HASH, &grunt, &grunt, grunt.mail()).with_parents([PARENT]);
    let response = run(request(SPEC_REPO, vec![denied])).await;

    assert!(!response.passed());
    assert_eq!(response.error_count(), 1);
    assert_eq!(error_codes(&response, HASH), vec![ApiStatusCode::ErrorSpecProject]);
    assert_eq!(response.status(), ApiStatusCode::ErrorSpecProject);
}

#[tokio::test]
async fn spec_denial_wins_over_later_projects() {
    let mut projects = Projects::sample();
    projects.0.push(Project {
        github_repos: vec![SPEC_REPO.to_string()],
        committers: vec!["grunter".to_string()],
        ..Project::new("mirror.proj", "Mirror of the spec repo")
    });
    let validator = validator_with(
        Arc::new(Accounts::sample()),
        projects,
        ValidationPolicy::default(),
    );
    let grunt = grunt();
    let commit = signed_off(HASH, &grunt, &grunt, grunt.mail());

    let response = validator.validate(&request(SPEC_REPO, vec![commit])).await;

    assert!(!response.passed());
    assert!(error_codes(&response, HASH).contains(&ApiStatusCode::ErrorSpecProject));
}

#[tokio::test]
async fn bot_account_counts_as_committer() {
    let bot = user("Prototype Bot", "2.bot@eclipse.org");
    let commit = Commit::new(HASH, bot.clone(), bot);
    let accounts = Accounts::sample().with_account(Identity::new(7, "proto-bot", "2.bot@eclipse.org"));
    let validator = validator_with(
        Arc::new(accounts),
        Projects::sample(),
        ValidationPolicy::default(),
    );

    let on_own_project = validator
        .validate(&request(PROTOTYPE_REPO, vec![commit.clone()]))
        .await;
    assert!(on_own_project.passed());

    // The bot is scoped to the prototype project only.
    let elsewhere = validator.validate(&request(SAMPLE_REPO, vec![commit])).await;
    assert!(!elsewhere.passed());
    assert_eq!(error_codes(&elsewhere, HASH).len(), 2);
}

#[tokio::test]
async fn unknown_author_fails() {
    let (rando, grunt) = (user("Rando Calressian", "rando@nowhere.co"), grunt());
    let commit = signed_off(HASH, &rando, &grunt, rando.mail()).with_parents([PARENT]);

    let response = run(request(SAMPLE_REPO, vec![commit])).await;

    assert!(!response.passed());
    assert_eq!(response.error_count(), 1);
    let status = response.commit(HASH).unwrap();
    assert_eq!(status.errors[0].message, "Author must have a registered account");
    assert!(status
        .messages
        .iter()
        .any(|m| m.message.contains("rando@nowhere.co")));
}

#[tokio::test]
async fn unknown_committer_fails() {
    let (grunt, rando) = (grunt(), user("Rando Calressian", "rando@nowhere.co"));
    let commit = signed_off(HASH, &grunt, &rando, grunt.mail()).with_parents([PARENT]);

    let response = run(request(SAMPLE_REPO, vec![commit])).await;

    assert!(!response.passed());
    assert_eq!(response.error_count(), 1);
    assert_eq!(
        response.commit(HASH).unwrap().errors[0].message,
        "Committing user must have a registered account"
    );
}

#[tokio::test]
async fn merge_commits_are_validated_by_default() {
    let rando = user("Rando Calressian", "rando@nowhere.co");
    let commit = signed_off(HASH, &rando, &rando, rando.mail())
        .with_parents([PARENT, "46bb69bf6aa4ed26b2bf8c322ae05bef0bcc5c11"]);

    let response = run(request(SAMPLE_REPO, vec![commit])).await;

    assert!(!response.passed());
    assert_eq!(response.error_count(), 1);
}

#[tokio::test]
async fn merge_commits_pass_when_configured() {
    let rando = user("Rando Calressian", "rando@nowhere.co");
    let commit = signed_off(HASH, &rando, &rando, rando.mail())
        .with_parents([PARENT, "46bb69bf6aa4ed26b2bf8c322ae05bef0bcc5c11"]);
    let policy = ValidationPolicy {
        merge_commits: MergeCommitPolicy::Pass,
        ..ValidationPolicy::default()
    };

    let response = validator(policy)
        .validate(&request(SAMPLE_REPO, vec![commit]))
        .await;

    assert!(response.passed());
    let messages = &response.commit(HASH).unwrap().messages;
    assert_eq!(
        messages.last().unwrap().message,
        format!("Commit '{HASH}' has multiple parents, merge commit detected, passing")
    );
}

fn batch_with_invalid_first() -> ValidationRequest {
    let wizard = wizard();
    let mut invalid = signed_off("", &wizard, &wizard, wizard.mail());
    invalid.hash = None;
    request(
        SAMPLE_REPO,
        vec![invalid, signed_off(HASH, &wizard, &wizard, wizard.mail())],
    )
}

#[tokio::test]
async fn invalid_commit_is_skipped_by_default() {
    let response = run(batch_with_invalid_first()).await;

    assert!(!response.passed());
    assert_eq!(response.error_count(), 1);
    assert_eq!(response.commit(NIL_HASH_KEY).unwrap().errors.len(), 1);
    let reviewed = response.commit(HASH).unwrap();
    assert!(reviewed.errors.is_empty());
    assert!(!reviewed.messages.is_empty());
}

#[tokio::test]
async fn invalid_commit_aborts_batch_when_configured() {
    let policy = ValidationPolicy {
        invalid_commit: InvalidCommitPolicy::Abort,
        ..ValidationPolicy::default()
    };

    let response = validator(policy).validate(&batch_with_invalid_first()).await;

    assert!(!response.passed());
    assert_eq!(response.error_count(), 1);
    assert!(response.commit(HASH).is_none());
}

#[tokio::test]
async fn null_commit_entry_is_invalid() {
    let mut request = request(SAMPLE_REPO, vec![]);
    request.commits = Some(vec![None]);

    let response = run(request).await;

    assert_eq!(response.error_count(), 1);
    assert!(response.commit(NIL_HASH_KEY).is_some());
}

#[tokio::test]
async fn malformed_request_yields_single_error() {
    let wizard = wizard();
    let commit = signed_off(HASH, &wizard, &wizard, wizard.mail());

    let empty = run(request(SAMPLE_REPO, vec![])).await;
    let errors = &empty.commit(NIL_HASH_KEY).unwrap().errors;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "A commit is required to validate");

    let mut no_provider = request(SAMPLE_REPO, vec![commit.clone()]);
    no_provider.provider = None;
    let response = run(no_provider).await;
    assert_eq!(response.error_count(), 1);
    assert!(response.commit(HASH).is_none());

    let mut no_repo = request(SAMPLE_REPO, vec![commit]);
    no_repo.repo_url = None;
    let response = run(no_repo).await;
    assert_eq!(response.error_count(), 1);
    assert_eq!(response.status(), ApiStatusCode::ErrorDefault);
}

#[tokio::test]
async fn untracked_repository_is_reported() {
    let barshall = barshall();
    let commit = signed_off(HASH, &barshall, &barshall, barshall.mail());
    let mut request = request("https://gitlab.example.org/unknown", vec![commit]);
    request.provider = Some(Provider::Gitlab);

    let response = run(request).await;

    assert!(!response.tracked_project());
    assert!(response.passed());
}

#[tokio::test]
async fn resubmission_is_idempotent_and_cached() {
    let accounts = Arc::new(Accounts::sample());
    let validator = validator_with(accounts.clone(), Projects::sample(), ValidationPolicy::default());
    let (wizard, barshall) = (wizard(), barshall());
    let request = request(
        PROTOTYPE_REPO,
        vec![signed_off(HASH, &barshall, &wizard, barshall.mail())],
    );

    let first = serde_json::to_value(validator.validate(&request).await).unwrap();
    let second = serde_json::to_value(validator.validate(&request).await).unwrap();

    let without_time = |mut value: serde_json::Value| {
        value.as_object_mut().unwrap().remove("time");
        value
    };
    assert_eq!(without_time(first), without_time(second));
    // Author and committer resolved once each.
    assert_eq!(accounts.lookups.load(Ordering::SeqCst), 2);
}

use crate::types::{Commit, GitIdentity};
use regex::Regex;
use std::sync::LazyLock;

static SIGNED_OFF_BY_FOOTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)Signed-off-by:([^<\n]*)<([^>\n]*@[^>\n]*)>[ \t\r]*$")
        .expect("sign-off footer pattern is valid")
});

/// Structural checks and footer extraction for a single commit. No I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitChecker;

impl CommitChecker {
    /// A commit is checkable when it has a hash and both the author and committer
    /// carry a mail address. Body, subject and parents are optional.
    pub fn validate(commit: Option<&Commit>) -> bool {
        let Some(commit) = commit else {
            return false;
        };
        commit.hash().is_some()
            && has_mail(commit.author.as_ref())
            && has_mail(commit.committer.as_ref())
    }

    /// Mail from the first `Signed-off-by: Name <mail>` footer in the body.
    ///
    /// The label is case-sensitive, the name may be empty, and the bracketed mail
    /// must end its line.
    pub fn extract_sign_off(commit: Option<&Commit>) -> Option<&str> {
        let body = commit?.body.as_deref()?;
        SIGNED_OFF_BY_FOOTER
            .captures(body)
            .and_then(|captures| captures.get(2))
            .map(|mail| mail.as_str())
    }
}

fn has_mail(identity: Option<&GitIdentity>) -> bool {
    identity.is_some_and(|identity| !identity.mail().is_empty())
}

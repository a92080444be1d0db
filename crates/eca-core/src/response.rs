use crate::error::EcaError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Bucket key used for commits that arrive without a hash.
pub const NIL_HASH_KEY: &str = "_nil";

/// Signed status codes carried by every recorded message.
///
/// Positive codes mark success, negative codes mark a failed check. They serialize as
/// their raw integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ApiStatusCode {
    SuccessDefault,
    SuccessCommitter,
    SuccessContributor,
    ErrorDefault,
    ErrorSignOff,
    ErrorSpecProject,
}

impl ApiStatusCode {
    pub const fn value(self) -> i32 {
        match self {
            ApiStatusCode::SuccessDefault => 200,
            ApiStatusCode::SuccessCommitter => 201,
            ApiStatusCode::SuccessContributor => 202,
            ApiStatusCode::ErrorDefault => -401,
            ApiStatusCode::ErrorSignOff => -402,
            ApiStatusCode::ErrorSpecProject => -403,
        }
    }

    pub const fn is_error(self) -> bool {
        self.value() < 0
    }

    /// Coarse severity fold: the code with the larger magnitude wins, ties go to
    /// `next`.
    pub fn more_severe(self, next: ApiStatusCode) -> ApiStatusCode {
        if next.value().abs() >= self.value().abs() {
            next
        } else {
            self
        }
    }
}

impl From<ApiStatusCode> for i32 {
    fn from(code: ApiStatusCode) -> Self {
        code.value()
    }
}

impl TryFrom<i32> for ApiStatusCode {
    type Error = EcaError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            200 => Ok(ApiStatusCode::SuccessDefault),
            201 => Ok(ApiStatusCode::SuccessCommitter),
            202 => Ok(ApiStatusCode::SuccessContributor),
            -401 => Ok(ApiStatusCode::ErrorDefault),
            -402 => Ok(ApiStatusCode::ErrorSignOff),
            -403 => Ok(ApiStatusCode::ErrorSpecProject),
            other => Err(EcaError::UnknownStatusCode(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
    pub code: ApiStatusCode,
}

/// Everything recorded against one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub messages: Vec<StatusMessage>,
    pub warnings: Vec<StatusMessage>,
    pub errors: Vec<StatusMessage>,
}

/// Outcome of one validation request.
///
/// Owned by a single request. `error_count` and `passed` are derived from the commit
/// buckets every time they are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResponse {
    time: DateTime<Utc>,
    commits: BTreeMap<String, CommitStatus>,
    tracked_project: bool,
    status: ApiStatusCode,
}

impl Default for ValidationResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResponse {
    pub fn new() -> Self {
        Self {
            time: Utc::now(),
            commits: BTreeMap::new(),
            tracked_project: false,
            status: ApiStatusCode::SuccessDefault,
        }
    }

    pub fn add_message(&mut self, hash: Option<&str>, message: impl Into<String>, code: ApiStatusCode) {
        let entry = self.record(message, code);
        self.bucket(hash).messages.push(entry);
    }

    pub fn add_warning(&mut self, hash: Option<&str>, message: impl Into<String>, code: ApiStatusCode) {
        let entry = self.record(message, code);
        self.bucket(hash).warnings.push(entry);
    }

    pub fn add_error(&mut self, hash: Option<&str>, message: impl Into<String>, code: ApiStatusCode) {
        let entry = self.record(message, code);
        self.bucket(hash).errors.push(entry);
    }

    fn record(&mut self, message: impl Into<String>, code: ApiStatusCode) -> StatusMessage {
        self.status = self.status.more_severe(code);
        StatusMessage {
            message: message.into(),
            code,
        }
    }

    fn bucket(&mut self, hash: Option<&str>) -> &mut CommitStatus {
        let key = hash.filter(|hash| !hash.is_empty()).unwrap_or(NIL_HASH_KEY);
        self.commits.entry(key.to_string()).or_default()
    }

    pub fn error_count(&self) -> usize {
        self.commits.values().map(|status| status.errors.len()).sum()
    }

    pub fn passed(&self) -> bool {
        self.error_count() == 0
    }

    pub fn status(&self) -> ApiStatusCode {
        self.status
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn commits(&self) -> &BTreeMap<String, CommitStatus> {
        &self.commits
    }

    pub fn commit(&self, hash: &str) -> Option<&CommitStatus> {
        self.commits.get(hash)
    }

    pub fn tracked_project(&self) -> bool {
        self.tracked_project
    }

    pub fn set_tracked_project(&mut self, tracked: bool) {
        self.tracked_project = tracked;
    }
}

#[derive(Serialize)]
struct ResponseView<'a> {
    passed: bool,
    error_count: usize,
    time: &'a DateTime<Utc>,
    commits: &'a BTreeMap<String, CommitStatus>,
    tracked_project: bool,
    status: ApiStatusCode,
}

impl Serialize for ValidationResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ResponseView {
            passed: self.passed(),
            error_count: self.error_count(),
            time: &self.time,
            commits: &self.commits,
            tracked_project: self.tracked_project,
            status: self.status,
        }
        .serialize(serializer)
    }
}

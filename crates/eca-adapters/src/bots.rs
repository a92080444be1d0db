use crate::{check_status, decode, normalize_base, transport};
use async_trait::async_trait;
use eca_core::{BotDirectory, BotUser, DirectoryError};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct BotRecord {
    id: Value,
    #[serde(default)]
    username: String,
    email: String,
    #[serde(alias = "projectId")]
    project_id: String,
}

impl From<BotRecord> for BotUser {
    fn from(record: BotRecord) -> Self {
        let id = match record.id {
            Value::String(id) => id,
            other => other.to_string(),
        };
        BotUser {
            id,
            username: record.username,
            mail: record.email,
            project_id: record.project_id,
        }
    }
}

/// Client for `{base}/bots`.
pub struct BotsClient {
    http: Client,
    base_url: String,
}

impl BotsClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
        }
    }
}

#[async_trait]
impl BotDirectory for BotsClient {
    async fn list_all(&self) -> Result<Vec<BotUser>, DirectoryError> {
        let url = format!("{}/bots", self.base_url);
        let response = self.http.get(&url).send().await.map_err(transport)?;
        let response = check_status(response, "bots").await?;
        let records: Vec<BotRecord> = decode(response).await?;
        Ok(records.into_iter().map(BotUser::from).collect())
    }
}

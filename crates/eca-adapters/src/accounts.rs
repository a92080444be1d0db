use crate::{check_status, decode, normalize_base, transport};
use async_trait::async_trait;
use eca_core::{DirectoryError, Identity, IdentityDirectory, TokenGuard};
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

/// Account lookups against `{base}/account/profile`, authenticated with the shared
/// bearer token.
pub struct AccountsClient {
    http: Client,
    base_url: String,
    tokens: Arc<TokenGuard>,
}

impl AccountsClient {
    pub fn new(http: Client, base_url: impl Into<String>, tokens: Arc<TokenGuard>) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
            tokens,
        }
    }
}

#[async_trait]
impl IdentityDirectory for AccountsClient {
    async fn lookup(&self, mail: &str) -> Result<Vec<Identity>, DirectoryError> {
        let url = format!("{}/account/profile", self.base_url);
        let mut request = self.http.get(&url).query(&[("mail", mail)]);
        match self.tokens.token().await {
            Some(token) => request = request.bearer_auth(token),
            None => debug!("no access token available, calling accounts API anonymously"),
        }

        let response = request.send().await.map_err(transport)?;
        let response = check_status(response, mail).await?;
        decode(response).await
    }
}

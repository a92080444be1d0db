//! Shared bearer token for outbound directory calls.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token endpoint unreachable: {0}")]
    Transport(String),

    #[error("token exchange rejected: {0}")]
    Rejected(String),

    #[error("malformed token response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_in: Duration,
}

/// Performs the network credential exchange. Only [`TokenGuard`] calls this.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn exchange(&self) -> Result<AccessToken, TokenError>;
}

#[derive(Debug, Default)]
struct TokenState {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    generation: u64,
}

impl TokenState {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.token.is_some() && self.expires_at.is_some_and(|expires_at| now < expires_at)
    }
}

/// Holds one token and serializes its refresh.
///
/// Callers that find the token stale queue on the write lock; the first one performs
/// the exchange and the rest observe the new generation and return its result.
pub struct TokenGuard {
    provider: Arc<dyn TokenProvider>,
    state: RwLock<TokenState>,
}

impl std::fmt::Debug for TokenGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGuard").finish_non_exhaustive()
    }
}

impl TokenGuard {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            state: RwLock::new(TokenState::default()),
        }
    }

    /// Current token, refreshing it first when absent or expired.
    ///
    /// A failed exchange is logged and the previous token (possibly none) returned.
    pub async fn token(&self) -> Option<String> {
        let observed = {
            let state = self.state.read().await;
            if state.is_fresh(Utc::now()) {
                return state.token.clone();
            }
            state.generation
        };

        let mut state = self.state.write().await;
        if state.is_fresh(Utc::now()) || state.generation != observed {
            return state.token.clone();
        }
        state.generation += 1;

        match self.provider.exchange().await {
            Ok(token) => {
                let now = Utc::now();
                state.expires_at = ChronoDuration::from_std(token.expires_in)
                    .ok()
                    .and_then(|ttl| now.checked_add_signed(ttl));
                state.token = Some(token.value);
                debug!(expires_at = ?state.expires_at, "refreshed directory access token");
            }
            Err(err) => {
                warn!(error = %err, "token exchange failed, keeping previous token");
            }
        }
        state.token.clone()
    }
}

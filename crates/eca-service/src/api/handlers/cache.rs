//! Cache administration endpoints

use crate::api::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::{Path, State};
use axum::{http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct CacheEntryView {
    pub kind: &'static str,
    pub key: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CacheListing {
    pub ttl_secs: u64,
    pub entries: Vec<CacheEntryView>,
}

/// `GET /eca/admin/cache`: live keys and when each expires.
pub async fn list_cache(State(state): State<AppState>) -> Json<CacheListing> {
    let cache = state.cache();
    let entries = cache
        .keys()
        .into_iter()
        .map(|key| CacheEntryView {
            expires_at: cache.expires_at(&key),
            kind: key.kind,
            key: key.key,
        })
        .collect();
    Json(CacheListing {
        ttl_secs: cache.ttl().as_secs(),
        entries,
    })
}

/// `DELETE /eca/admin/cache`
pub async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.cache().invalidate_all();
    info!("cache cleared");
    StatusCode::NO_CONTENT
}

/// `DELETE /eca/admin/cache/:key`: drops `key` from every bucket.
pub async fn evict_cache_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    let cache = state.cache();
    if !cache.keys().iter().any(|entry| entry.key == key) {
        return Err(ApiError::NotFound(format!("no cached entry for '{key}'")));
    }
    cache.invalidate(&key);
    info!(%key, "cache key evicted");
    Ok(StatusCode::NO_CONTENT)
}

//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/eca", post(handlers::validate_commits))
        // Cache administration
        .route(
            "/eca/admin/cache",
            get(handlers::list_cache).delete(handlers::clear_cache),
        )
        .route("/eca/admin/cache/:key", delete(handlers::evict_cache_key))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

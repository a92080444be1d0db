//! Commit validation endpoint

use crate::api::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, Json};
use eca_core::{ValidationRequest, ValidationResponse};
use tracing::info;

/// `POST /eca`: 200 when every commit passed, 403 otherwise. Both carry the full
/// validation response.
pub async fn validate_commits(
    State(state): State<AppState>,
    payload: Result<Json<ValidationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ValidationResponse>)> {
    let Json(request) = payload?;

    // A panic inside the engine surfaces as a 500 instead of a dropped connection.
    let validator = state.validator.clone();
    let response = tokio::spawn(async move { validator.validate(&request).await })
        .await
        .map_err(|e| ApiError::Internal(format!("validation task failed: {e}")))?;

    let status = if response.passed() {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    };
    info!(
        passed = response.passed(),
        errors = response.error_count(),
        "validation complete"
    );
    Ok((status, Json(response)))
}

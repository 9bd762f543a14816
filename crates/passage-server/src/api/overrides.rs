//! Override endpoints: validate, apply, query, revoke.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use passage_core::{
    OverrideRequest, OverrideStatistics, OverrideValidation, SafetyError, SafetyOverride,
};

use crate::api::request_id::RequestId;
use crate::api::safety::bad_request;
use crate::state::AppState;

/// Dry-run validation of an override request.
pub async fn validate_override(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OverrideRequest>,
) -> Json<OverrideValidation> {
    Json(state.validate_override(&req))
}

/// Apply an override. The recorded override is always pushed through the
/// audit log; this is the single most important audit event in the system.
pub async fn apply_override(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<OverrideRequest>,
) -> Result<(StatusCode, Json<SafetyOverride>), (StatusCode, Json<serde_json::Value>)> {
    match state.apply_override(req) {
        Ok(record) => {
            state.audit(|log| log.log_override(&request_id.0, &record));
            Ok((StatusCode::CREATED, Json(record)))
        }
        Err(SafetyError::OverrideRejected { reasons }) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "override rejected", "reasons": reasons })),
        )),
        Err(err) => Err(bad_request(&err.to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListOverridesQuery {
    pub user_id: Option<String>,
}

/// List a user's overrides, newest first.
pub async fn list_user_overrides(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOverridesQuery>,
) -> Result<Json<Vec<SafetyOverride>>, (StatusCode, Json<serde_json::Value>)> {
    match query.user_id.as_deref() {
        Some(user_id) => Ok(Json(state.user_overrides(user_id))),
        None => Err(bad_request("user_id query parameter is required")),
    }
}

pub async fn statistics(State(state): State<Arc<AppState>>) -> Json<OverrideStatistics> {
    Json(state.override_statistics())
}

#[derive(Debug, Serialize)]
pub struct WarningStatusResponse {
    pub warning_id: String,
    pub overridden: bool,
}

/// Whether any unexpired override currently suppresses a warning.
pub async fn check_warning(
    State(state): State<Arc<AppState>>,
    Path(warning_id): Path<String>,
) -> Json<WarningStatusResponse> {
    let overridden = state.is_warning_overridden(&warning_id);
    Json(WarningStatusResponse {
        warning_id,
        overridden,
    })
}

#[derive(Debug, Deserialize)]
pub struct RevokeQuery {
    pub reason: Option<String>,
}

/// Revoke an override by id.
pub async fn revoke(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<RevokeQuery>,
) -> StatusCode {
    let reason = query.reason.as_deref().unwrap_or("revoked by operator");
    if state.revoke_override(&id, reason) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
}

/// Drop expired overrides from the record.
pub async fn cleanup(State(state): State<Arc<AppState>>) -> Json<CleanupResponse> {
    Json(CleanupResponse {
        removed: state.cleanup_expired_overrides(),
    })
}

//! Audit query endpoints.
//!
//! The in-memory ring buffer is the primary read source; the durable sink
//! is consulted only for entries the buffer no longer holds, and any store
//! failure falls back to the buffer silently.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use passage_core::{AuditAction, AuditLogEntry};

use crate::persistence;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CriticalQuery {
    pub limit: Option<usize>,
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct OverridesQuery {
    pub user_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

/// Most recent entries, oldest first.
pub async fn recent(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<AuditLogEntry>> {
    Json(state.recent_logs(query.limit.unwrap_or(100)))
}

/// Critical entries. Falls through to the durable sink when the buffer has
/// none in range.
pub async fn critical(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CriticalQuery>,
) -> Json<Vec<AuditLogEntry>> {
    let limit = query.limit.unwrap_or(50);
    let from_memory = state.critical_logs(limit);
    if !from_memory.is_empty() {
        return Json(from_memory);
    }

    if let Some(db) = state.db() {
        match persistence::audit::query_critical(db.pool(), query.since, limit as i64).await {
            Ok(entries) => return Json(entries),
            Err(err) => tracing::error!("durable audit read failed: {err}"),
        }
    }

    Json(from_memory)
}

/// All entries for one request id.
pub async fn by_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<String>,
) -> Json<Vec<AuditLogEntry>> {
    let from_memory = state.logs_by_request(&request_id);
    if !from_memory.is_empty() {
        return Json(from_memory);
    }

    if let Some(db) = state.db() {
        match persistence::audit::query_by_request_id(db.pool(), &request_id).await {
            Ok(entries) => return Json(entries),
            Err(err) => tracing::error!("durable audit read failed: {err}"),
        }
    }

    Json(from_memory)
}

/// Override audit trail, optionally filtered by user.
pub async fn overrides(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OverridesQuery>,
) -> Json<Vec<AuditLogEntry>> {
    if let Some(db) = state.db() {
        match persistence::audit::query_overrides(db.pool(), query.user_id.as_deref(), query.since)
            .await
        {
            Ok(entries) => return Json(entries),
            Err(err) => tracing::error!("durable audit read failed: {err}"),
        }
    }

    let entries = state
        .export_logs()
        .into_iter()
        .filter(|entry| entry.action == AuditAction::OverrideApplied)
        .filter(|entry| match (&query.user_id, &entry.user_id) {
            (Some(wanted), Some(actual)) => wanted == actual,
            (Some(_), None) => false,
            (None, _) => true,
        })
        .collect();
    Json(entries)
}

//! Durable audit sink.
//!
//! The write side is fire-and-forget: a failed insert is logged and
//! discarded, never surfaced to the safety-decision caller. The read side
//! is best-effort; callers fall back to the in-memory buffer.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use passage_core::audit::{AuditAction, AuditLogEntry, AuditResult};

pub async fn insert_entry(pool: &SqlitePool, entry: &AuditLogEntry) -> Result<()> {
    sqlx::query(
        "INSERT INTO safety_audit_log (id, timestamp, user_id, request_id, action, details, result) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(&entry.id)
    .bind(entry.timestamp.to_rfc3339())
    .bind(&entry.user_id)
    .bind(&entry.request_id)
    .bind(entry.action.as_str())
    .bind(serde_json::to_string(&entry.details)?)
    .bind(entry.result.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn query_by_request_id(
    pool: &SqlitePool,
    request_id: &str,
) -> Result<Vec<AuditLogEntry>> {
    let rows = sqlx::query_as::<_, AuditRow>(
        "SELECT id, timestamp, user_id, request_id, action, details, result \
         FROM safety_audit_log WHERE request_id = ?1 ORDER BY timestamp",
    )
    .bind(request_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(AuditLogEntry::from).collect())
}

pub async fn query_critical(
    pool: &SqlitePool,
    since: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<AuditLogEntry>> {
    let since = since.map(|t| t.to_rfc3339()).unwrap_or_default();
    let rows = sqlx::query_as::<_, AuditRow>(
        "SELECT id, timestamp, user_id, request_id, action, details, result \
         FROM safety_audit_log WHERE result = 'critical' AND timestamp >= ?1 \
         ORDER BY timestamp DESC LIMIT ?2",
    )
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut entries: Vec<AuditLogEntry> = rows.into_iter().map(AuditLogEntry::from).collect();
    entries.reverse(); // oldest first, matching the in-memory query surface
    Ok(entries)
}

pub async fn query_overrides(
    pool: &SqlitePool,
    user_id: Option<&str>,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<AuditLogEntry>> {
    let since = since.map(|t| t.to_rfc3339()).unwrap_or_default();
    let rows = sqlx::query_as::<_, AuditRow>(
        "SELECT id, timestamp, user_id, request_id, action, details, result \
         FROM safety_audit_log WHERE action = 'override_applied' AND timestamp >= ?1 \
         AND (?2 IS NULL OR user_id = ?2) ORDER BY timestamp",
    )
    .bind(since)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(AuditLogEntry::from).collect())
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct AuditRow {
    id: String,
    timestamp: String,
    user_id: Option<String>,
    request_id: String,
    action: String,
    details: String,
    result: String,
}

impl From<AuditRow> for AuditLogEntry {
    fn from(row: AuditRow) -> Self {
        AuditLogEntry {
            id: row.id,
            timestamp: DateTime::parse_from_rfc3339(&row.timestamp)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            user_id: row.user_id,
            request_id: row.request_id,
            action: row.action.parse().unwrap_or(AuditAction::DataSourceUsed),
            details: serde_json::from_str(&row.details).unwrap_or(serde_json::Value::Null),
            result: row.result.parse().unwrap_or(AuditResult::Success),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;
    use passage_core::SafetyAuditLog;

    #[tokio::test]
    async fn insert_and_query_round_trip() {
        let db = init_database(":memory:", 1).await.unwrap();
        let mut log = SafetyAuditLog::default();

        let routine = log.log_data_source("req-1", "noaa-tides", "ok");
        let critical = log.log_warning(
            "req-1",
            Some("capt-rowe"),
            "warn-1",
            "shallow_water",
            "critical",
            "0.4 ft under keel at Bulkhead Rip",
        );
        insert_entry(db.pool(), &routine).await.unwrap();
        insert_entry(db.pool(), &critical).await.unwrap();

        let by_request = query_by_request_id(db.pool(), "req-1").await.unwrap();
        assert_eq!(by_request.len(), 2);

        let criticals = query_critical(db.pool(), None, 50).await.unwrap();
        assert_eq!(criticals.len(), 1);
        assert_eq!(criticals[0].action, AuditAction::WarningGenerated);
        assert_eq!(criticals[0].result, AuditResult::Critical);

        assert!(query_by_request_id(db.pool(), "req-missing")
            .await
            .unwrap()
            .is_empty());
    }
}

//! Append-only audit record of every safety decision.
//!
//! The in-memory ring buffer is the source of truth for the process
//! lifetime; durable persistence is best-effort and owned by the caller.
//! Each `log_*` method builds the typed entry, appends it (dropping the
//! oldest entry past capacity, with no compaction by importance), writes
//! through to the structured logger at a level matching the action's
//! severity, and returns a clone of the entry for forwarding to a durable
//! sink.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::overrides::SafetyOverride;

/// Default ring-buffer capacity.
pub const DEFAULT_AUDIT_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    RouteAnalyzed,
    WarningGenerated,
    OverrideApplied,
    HazardDetected,
    RecommendationMade,
    DataSourceUsed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RouteAnalyzed => "route_analyzed",
            AuditAction::WarningGenerated => "warning_generated",
            AuditAction::OverrideApplied => "override_applied",
            AuditAction::HazardDetected => "hazard_detected",
            AuditAction::RecommendationMade => "recommendation_made",
            AuditAction::DataSourceUsed => "data_source_used",
        }
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "route_analyzed" => Ok(AuditAction::RouteAnalyzed),
            "warning_generated" => Ok(AuditAction::WarningGenerated),
            "override_applied" => Ok(AuditAction::OverrideApplied),
            "hazard_detected" => Ok(AuditAction::HazardDetected),
            "recommendation_made" => Ok(AuditAction::RecommendationMade),
            "data_source_used" => Ok(AuditAction::DataSourceUsed),
            _ => Err(format!("unknown audit action '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditResult {
    Success,
    Warning,
    Critical,
}

impl AuditResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditResult::Success => "success",
            AuditResult::Warning => "warning",
            AuditResult::Critical => "critical",
        }
    }
}

impl std::str::FromStr for AuditResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(AuditResult::Success),
            "warning" => Ok(AuditResult::Warning),
            "critical" => Ok(AuditResult::Critical),
            _ => Err(format!("unknown audit result '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub request_id: String,
    pub action: AuditAction,
    pub details: serde_json::Value,
    pub result: AuditResult,
}

/// Capped in-memory audit buffer.
#[derive(Debug, Clone)]
pub struct SafetyAuditLog {
    entries: VecDeque<AuditLogEntry>,
    capacity: usize,
}

impl Default for SafetyAuditLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }
}

impl SafetyAuditLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn append(&mut self, entry: AuditLogEntry) -> AuditLogEntry {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.clone());
        entry
    }

    fn build(
        request_id: &str,
        user_id: Option<&str>,
        action: AuditAction,
        details: serde_json::Value,
        result: AuditResult,
    ) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            user_id: user_id.map(str::to_string),
            request_id: request_id.to_string(),
            action,
            details,
            result,
        }
    }

    pub fn log_route_analysis(
        &mut self,
        request_id: &str,
        user_id: Option<&str>,
        waypoint_count: usize,
        hazards_found: usize,
    ) -> AuditLogEntry {
        let result = if hazards_found > 0 {
            AuditResult::Warning
        } else {
            AuditResult::Success
        };
        let entry = Self::build(
            request_id,
            user_id,
            AuditAction::RouteAnalyzed,
            json!({ "waypoint_count": waypoint_count, "hazards_found": hazards_found }),
            result,
        );
        match result {
            AuditResult::Success => {
                tracing::info!(request_id, waypoint_count, hazards_found, "route analyzed")
            }
            _ => tracing::warn!(request_id, waypoint_count, hazards_found, "route analyzed"),
        }
        self.append(entry)
    }

    pub fn log_warning(
        &mut self,
        request_id: &str,
        user_id: Option<&str>,
        warning_id: &str,
        warning_type: &str,
        severity: &str,
        message: &str,
    ) -> AuditLogEntry {
        let result = if severity == "critical" || severity == "urgent" {
            AuditResult::Critical
        } else {
            AuditResult::Warning
        };
        let entry = Self::build(
            request_id,
            user_id,
            AuditAction::WarningGenerated,
            json!({
                "warning_id": warning_id,
                "warning_type": warning_type,
                "severity": severity,
                "message": message,
            }),
            result,
        );
        tracing::warn!(request_id, warning_id, warning_type, severity, "safety warning: {message}");
        self.append(entry)
    }

    pub fn log_hazard(
        &mut self,
        request_id: &str,
        user_id: Option<&str>,
        hazard_type: &str,
        severity: &str,
        details: serde_json::Value,
    ) -> AuditLogEntry {
        let result = if severity == "critical" {
            AuditResult::Critical
        } else {
            AuditResult::Warning
        };
        let entry = Self::build(
            request_id,
            user_id,
            AuditAction::HazardDetected,
            json!({ "hazard_type": hazard_type, "severity": severity, "details": details }),
            result,
        );
        tracing::warn!(request_id, hazard_type, severity, "hazard detected");
        self.append(entry)
    }

    /// Overrides are always recorded as critical; this is the single most
    /// important audit event in the system.
    pub fn log_override(&mut self, request_id: &str, record: &SafetyOverride) -> AuditLogEntry {
        let entry = Self::build(
            request_id,
            Some(record.user_id.as_str()),
            AuditAction::OverrideApplied,
            json!({
                "override_id": record.id,
                "warning_id": record.warning_id,
                "warning_type": record.warning_type,
                "justification": record.justification,
                "witnessed_by": record.witnessed_by,
                "expires_at": record.expires_at,
            }),
            AuditResult::Critical,
        );
        tracing::warn!(
            request_id,
            override_id = %record.id,
            warning_id = %record.warning_id,
            "override recorded in audit log"
        );
        self.append(entry)
    }

    pub fn log_recommendation(
        &mut self,
        request_id: &str,
        user_id: Option<&str>,
        priority: &str,
        recommendation: &str,
    ) -> AuditLogEntry {
        let result = if priority == "critical" {
            AuditResult::Critical
        } else {
            AuditResult::Success
        };
        let entry = Self::build(
            request_id,
            user_id,
            AuditAction::RecommendationMade,
            json!({ "priority": priority, "recommendation": recommendation }),
            result,
        );
        tracing::info!(request_id, priority, recommendation, "recommendation made");
        self.append(entry)
    }

    pub fn log_data_source(
        &mut self,
        request_id: &str,
        source: &str,
        status: &str,
    ) -> AuditLogEntry {
        let entry = Self::build(
            request_id,
            None,
            AuditAction::DataSourceUsed,
            json!({ "source": source, "status": status }),
            AuditResult::Success,
        );
        tracing::info!(request_id, source, status, "data source used");
        self.append(entry)
    }

    /// The most recent `n` entries, oldest first.
    pub fn get_recent_logs(&self, n: usize) -> Vec<AuditLogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn get_logs_by_request_id(&self, request_id: &str) -> Vec<AuditLogEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.request_id == request_id)
            .cloned()
            .collect()
    }

    /// The most recent `n` critical entries, oldest first.
    pub fn get_critical_logs(&self, n: usize) -> Vec<AuditLogEntry> {
        let critical: Vec<AuditLogEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.result == AuditResult::Critical)
            .cloned()
            .collect();
        let skip = critical.len().saturating_sub(n);
        critical.into_iter().skip(skip).collect()
    }

    /// Full copy of the buffer, oldest first.
    pub fn export_logs(&self) -> Vec<AuditLogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear_logs(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_drops_oldest_first() {
        let mut log = SafetyAuditLog::with_capacity(1000);
        for i in 0..1001 {
            log.log_data_source(&format!("req-{i}"), "noaa-charts", "ok");
        }
        let exported = log.export_logs();
        assert_eq!(exported.len(), 1000);
        assert_eq!(exported[0].request_id, "req-1");
        assert_eq!(exported[999].request_id, "req-1000");
    }

    #[test]
    fn eviction_ignores_importance() {
        // A critical override entry is evicted exactly like a routine one
        let mut log = SafetyAuditLog::with_capacity(2);
        let record = SafetyOverride {
            id: "ov-1".to_string(),
            user_id: "capt".to_string(),
            timestamp: Utc::now(),
            warning_id: "warn-1".to_string(),
            warning_type: "restricted_area".to_string(),
            justification: "transit authorized by range control".to_string(),
            acknowledged: true,
            witnessed_by: None,
            expires_at: None,
        };
        log.log_override("req-0", &record);
        log.log_data_source("req-1", "noaa-tides", "ok");
        log.log_data_source("req-2", "noaa-tides", "ok");

        let exported = log.export_logs();
        assert_eq!(exported.len(), 2);
        assert!(exported.iter().all(|e| e.action == AuditAction::DataSourceUsed));
    }

    #[test]
    fn result_derivation_per_action() {
        let mut log = SafetyAuditLog::default();

        assert_eq!(
            log.log_route_analysis("req", None, 5, 0).result,
            AuditResult::Success
        );
        assert_eq!(
            log.log_route_analysis("req", None, 5, 2).result,
            AuditResult::Warning
        );
        assert_eq!(
            log.log_warning("req", None, "w1", "shallow_water", "critical", "m").result,
            AuditResult::Critical
        );
        assert_eq!(
            log.log_warning("req", None, "w1", "shallow_water", "urgent", "m").result,
            AuditResult::Critical
        );
        assert_eq!(
            log.log_warning("req", None, "w1", "shallow_water", "moderate", "m").result,
            AuditResult::Warning
        );
        assert_eq!(
            log.log_hazard("req", None, "grounding", "critical", serde_json::Value::Null)
                .result,
            AuditResult::Critical
        );
        assert_eq!(
            log.log_hazard("req", None, "grounding", "high", serde_json::Value::Null)
                .result,
            AuditResult::Warning
        );
        assert_eq!(
            log.log_recommendation("req", None, "critical", "stay in port").result,
            AuditResult::Critical
        );
        assert_eq!(
            log.log_recommendation("req", None, "routine", "depart as planned").result,
            AuditResult::Success
        );
    }

    #[test]
    fn queries_filter_and_tail() {
        let mut log = SafetyAuditLog::default();
        log.log_data_source("req-a", "s", "ok");
        log.log_warning("req-b", None, "w1", "shallow_water", "critical", "m");
        log.log_data_source("req-a", "s2", "ok");

        assert_eq!(log.get_logs_by_request_id("req-a").len(), 2);
        assert_eq!(log.get_logs_by_request_id("req-zz").len(), 0);
        assert_eq!(log.get_critical_logs(50).len(), 1);
        assert_eq!(log.get_recent_logs(2).len(), 2);
        assert_eq!(log.get_recent_logs(100).len(), 3);

        log.clear_logs();
        assert!(log.is_empty());
    }
}

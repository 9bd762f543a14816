//! Validation and record-keeping for user overrides of safety warnings.
//!
//! Some warnings represent immediate danger and can never be overridden;
//! others require a witness. Every applied override is logged at WARN and
//! must also be pushed through the audit log by the caller.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SafetyError;

/// Warning types that represent immediate danger. Never overridable,
/// regardless of caller role.
pub const NON_OVERRIDABLE_TYPES: &[&str] = &[
    "grounding_imminent",
    "collision_course",
    "vessel_limits_exceeded",
];

/// Critical warning types that require a witness to override.
pub const WITNESS_REQUIRED_TYPES: &[&str] =
    &["severe_weather", "shallow_water", "restricted_area"];

/// Minimum trimmed length of an override justification.
pub const MIN_JUSTIFICATION_LEN: usize = 10;

fn default_true() -> bool {
    true
}

/// A request to suppress a previously issued warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideRequest {
    pub user_id: String,
    pub warning_id: String,
    pub warning_type: String,
    pub justification: String,
    #[serde(default = "default_true")]
    pub acknowledged: bool,
    #[serde(default)]
    pub witnessed_by: Option<String>,
    #[serde(default)]
    pub expiration_hours: Option<f64>,
}

/// Outcome of validating an override request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideValidation {
    pub can_override: bool,
    /// Whether the warning type is in the witness-required set. Reported
    /// even when validation succeeds.
    pub requires_witness: bool,
    pub reasons: Vec<String>,
}

/// A recorded override. Immutable once created; it leaves the record by
/// revocation or passive expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyOverride {
    pub id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub warning_id: String,
    pub warning_type: String,
    pub justification: String,
    pub acknowledged: bool,
    #[serde(default)]
    pub witnessed_by: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SafetyOverride {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverrideStatistics {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub by_type: BTreeMap<String, usize>,
}

/// Owns the override record and enforces the override business rules.
#[derive(Debug, Clone, Default)]
pub struct OverrideAuthority {
    overrides: HashMap<String, SafetyOverride>,
}

impl OverrideAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check an override request against the business rules without
    /// recording anything.
    pub fn validate_override(&self, request: &OverrideRequest) -> OverrideValidation {
        let mut reasons = Vec::new();
        let requires_witness = WITNESS_REQUIRED_TYPES.contains(&request.warning_type.as_str());

        if NON_OVERRIDABLE_TYPES.contains(&request.warning_type.as_str()) {
            reasons.push(format!(
                "warning type '{}' represents immediate danger and can never be overridden",
                request.warning_type
            ));
        }

        if request.justification.trim().len() < MIN_JUSTIFICATION_LEN {
            reasons.push(format!(
                "justification must be at least {MIN_JUSTIFICATION_LEN} characters"
            ));
        }

        let has_witness = request
            .witnessed_by
            .as_deref()
            .map(str::trim)
            .is_some_and(|w| !w.is_empty());
        if requires_witness && !has_witness {
            reasons.push(format!(
                "overriding a '{}' warning requires a witness",
                request.warning_type
            ));
        }

        OverrideValidation {
            can_override: reasons.is_empty(),
            requires_witness,
            reasons,
        }
    }

    /// Validate (again — defense in depth) and record an override.
    pub fn apply_override(
        &mut self,
        request: OverrideRequest,
    ) -> Result<SafetyOverride, SafetyError> {
        let validation = self.validate_override(&request);
        if !validation.can_override {
            return Err(SafetyError::OverrideRejected {
                reasons: validation.reasons,
            });
        }

        let now = Utc::now();
        let record = SafetyOverride {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id,
            timestamp: now,
            warning_id: request.warning_id,
            warning_type: request.warning_type,
            justification: request.justification,
            acknowledged: request.acknowledged,
            witnessed_by: request.witnessed_by,
            expires_at: request
                .expiration_hours
                .map(|hours| now + Duration::seconds((hours * 3600.0) as i64)),
        };

        tracing::warn!(
            override_id = %record.id,
            user_id = %record.user_id,
            warning_id = %record.warning_id,
            warning_type = %record.warning_type,
            witnessed_by = record.witnessed_by.as_deref().unwrap_or("-"),
            "safety warning overridden"
        );

        self.overrides.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    /// Whether any acknowledged, unexpired override exists for a warning.
    ///
    /// "Any unexpired match" semantics: multiple overrides may exist for
    /// one warning id historically, and any live one suppresses the
    /// warning. Expiry is checked here, at query time, not by a sweeper.
    pub fn is_warning_overridden(&self, warning_id: &str) -> bool {
        let now = Utc::now();
        self.overrides.values().any(|record| {
            record.warning_id == warning_id && record.acknowledged && !record.is_expired(now)
        })
    }

    /// Remove an override; true if something was removed.
    pub fn revoke_override(&mut self, id: &str, reason: &str) -> bool {
        match self.overrides.remove(id) {
            Some(record) => {
                tracing::warn!(
                    override_id = %record.id,
                    warning_id = %record.warning_id,
                    reason,
                    "safety override revoked"
                );
                true
            }
            None => false,
        }
    }

    /// All overrides recorded by a user, newest first.
    pub fn get_user_overrides(&self, user_id: &str) -> Vec<SafetyOverride> {
        let mut records: Vec<SafetyOverride> = self
            .overrides
            .values()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records
    }

    pub fn get_override_statistics(&self) -> OverrideStatistics {
        let now = Utc::now();
        let mut stats = OverrideStatistics {
            total: self.overrides.len(),
            ..Default::default()
        };
        for record in self.overrides.values() {
            if record.is_expired(now) {
                stats.expired += 1;
            } else {
                stats.active += 1;
            }
            *stats.by_type.entry(record.warning_type.clone()).or_insert(0) += 1;
        }
        stats
    }

    /// Drop expired overrides from the record; returns how many were
    /// removed.
    pub fn cleanup_expired_overrides(&mut self) -> usize {
        let now = Utc::now();
        let before = self.overrides.len();
        self.overrides.retain(|_, record| !record.is_expired(now));
        before - self.overrides.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(warning_type: &str) -> OverrideRequest {
        OverrideRequest {
            user_id: "capt-rowe".to_string(),
            warning_id: "warn-001".to_string(),
            warning_type: warning_type.to_string(),
            justification: "Local knowledge: dredged channel, verified this morning".to_string(),
            acknowledged: true,
            witnessed_by: Some("mate-ellis".to_string()),
            expiration_hours: None,
        }
    }

    #[test]
    fn grounding_imminent_is_never_overridable() {
        let authority = OverrideAuthority::new();
        let validation = authority.validate_override(&request("grounding_imminent"));
        assert!(!validation.can_override);

        // Even a perfect justification and witness cannot help
        let mut req = request("grounding_imminent");
        req.justification = "Extremely thorough justification with plenty of detail".to_string();
        req.witnessed_by = Some("the whole crew".to_string());
        assert!(!authority.validate_override(&req).can_override);
    }

    #[test]
    fn short_justification_is_rejected() {
        let authority = OverrideAuthority::new();
        let mut req = request("weather_advisory");
        req.justification = "  ok   ".to_string();
        let validation = authority.validate_override(&req);
        assert!(!validation.can_override);
        assert!(validation.reasons.iter().any(|r| r.contains("justification")));
    }

    #[test]
    fn critical_types_require_a_witness() {
        let authority = OverrideAuthority::new();
        for warning_type in ["severe_weather", "shallow_water", "restricted_area"] {
            let mut req = request(warning_type);
            req.witnessed_by = None;
            let validation = authority.validate_override(&req);
            assert!(!validation.can_override, "{warning_type} passed without witness");
            assert!(validation.requires_witness);

            let with_witness = authority.validate_override(&request(warning_type));
            assert!(with_witness.can_override);
            assert!(with_witness.requires_witness);
        }
    }

    #[test]
    fn non_critical_type_needs_no_witness() {
        let authority = OverrideAuthority::new();
        let mut req = request("weather_advisory");
        req.witnessed_by = None;
        let validation = authority.validate_override(&req);
        assert!(validation.can_override);
        assert!(!validation.requires_witness);
    }

    #[test]
    fn apply_round_trip() {
        let mut authority = OverrideAuthority::new();
        assert!(!authority.is_warning_overridden("warn-001"));

        let record = authority.apply_override(request("restricted_area")).unwrap();
        assert!(authority.is_warning_overridden("warn-001"));
        assert!(!authority.is_warning_overridden("warn-002"));

        assert!(authority.revoke_override(&record.id, "conditions changed"));
        assert!(!authority.is_warning_overridden("warn-001"));
        assert!(!authority.revoke_override(&record.id, "again"));
    }

    #[test]
    fn apply_rejects_invalid_requests() {
        let mut authority = OverrideAuthority::new();
        let err = authority
            .apply_override(request("collision_course"))
            .unwrap_err();
        assert!(matches!(err, SafetyError::OverrideRejected { .. }));
        assert!(!authority.is_warning_overridden("warn-001"));
    }

    #[test]
    fn expired_override_no_longer_suppresses_without_cleanup() {
        let mut authority = OverrideAuthority::new();
        let mut req = request("restricted_area");
        req.expiration_hours = Some(-1.0); // already in the past
        authority.apply_override(req).unwrap();

        assert!(!authority.is_warning_overridden("warn-001"));
        // The record is still there until an explicit cleanup
        assert_eq!(authority.get_override_statistics().expired, 1);
        assert_eq!(authority.cleanup_expired_overrides(), 1);
        assert_eq!(authority.get_override_statistics().total, 0);
    }

    #[test]
    fn statistics_count_by_type_and_expiry() {
        let mut authority = OverrideAuthority::new();
        authority.apply_override(request("restricted_area")).unwrap();

        let mut second = request("restricted_area");
        second.warning_id = "warn-002".to_string();
        authority.apply_override(second).unwrap();

        let mut expired = request("severe_weather");
        expired.warning_id = "warn-003".to_string();
        expired.expiration_hours = Some(-2.0);
        authority.apply_override(expired).unwrap();

        let stats = authority.get_override_statistics();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.by_type.get("restricted_area"), Some(&2));
        assert_eq!(stats.by_type.get("severe_weather"), Some(&1));
    }

    #[test]
    fn user_overrides_are_newest_first() {
        let mut authority = OverrideAuthority::new();
        authority.apply_override(request("restricted_area")).unwrap();
        let mut second = request("shallow_water");
        second.warning_id = "warn-002".to_string();
        authority.apply_override(second).unwrap();

        let records = authority.get_user_overrides("capt-rowe");
        assert_eq!(records.len(), 2);
        assert!(records[0].timestamp >= records[1].timestamp);
        assert!(authority.get_user_overrides("someone-else").is_empty());
    }
}

//! Shared application state wiring the core safety components together.
//!
//! Each registry-style component is single-writer by design; a plain mutex
//! per component is all the coordination the decision path needs. The
//! backing store is injected here rather than reached through any global
//! handle.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use passage_core::{
    AuditLogEntry, DepthSafetyEngine, OverrideAuthority, OverrideRequest, OverrideStatistics,
    OverrideValidation, RestrictedArea, RestrictedAreaRegistry, SafetyAuditLog, SafetyError,
    SafetyOverride, WeatherPatternDetector,
};
use passage_core::models::{AreaType, Waypoint};

use crate::config::Config;
use crate::persistence::{self, Database};

pub struct AppState {
    registry: Mutex<RestrictedAreaRegistry>,
    overrides: Mutex<OverrideAuthority>,
    audit: Mutex<SafetyAuditLog>,
    depth: DepthSafetyEngine,
    weather: WeatherPatternDetector,
    db: Option<Database>,
    config: Config,
}

fn recover<'a, T>(
    guard: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
    guard.unwrap_or_else(PoisonError::into_inner)
}

impl AppState {
    pub fn new(config: Config, db: Option<Database>) -> Self {
        Self {
            registry: Mutex::new(RestrictedAreaRegistry::new(
                config.area_refresh_secs,
                config.route_samples,
            )),
            overrides: Mutex::new(OverrideAuthority::new()),
            audit: Mutex::new(SafetyAuditLog::with_capacity(config.audit_capacity)),
            depth: DepthSafetyEngine::default(),
            weather: WeatherPatternDetector::default(),
            db,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> Option<&Database> {
        self.db.as_ref()
    }

    pub fn depth_engine(&self) -> &DepthSafetyEngine {
        &self.depth
    }

    pub fn weather_detector(&self) -> &WeatherPatternDetector {
        &self.weather
    }

    /// Lazy pull-based refresh of the area catalog.
    ///
    /// Consults the backing store only when the refresh interval has
    /// elapsed. The fail-open policy is right here: a fetch failure keeps
    /// the last-known-good in-memory catalog and is logged, never surfaced
    /// to the safety-decision caller.
    pub async fn ensure_fresh_areas(&self) {
        let Some(db) = &self.db else { return };

        let now = Utc::now();
        if !recover(self.registry.lock()).needs_refresh(now) {
            return;
        }

        match persistence::areas::load_active_areas(db.pool()).await {
            Ok(rows) => recover(self.registry.lock()).merge_store_areas(rows, now),
            Err(err) => {
                tracing::error!(
                    "restricted-area refresh failed, keeping last known catalog: {err}"
                );
            }
        }
    }

    // === Area registry ===

    pub fn check_route(&self, waypoints: &[Waypoint]) -> BTreeMap<String, RestrictedArea> {
        recover(self.registry.lock()).check_route(waypoints)
    }

    pub fn add_area(&self, area: RestrictedArea) {
        recover(self.registry.lock()).add_restricted_area(area);
    }

    pub fn remove_area(&self, id: &str) -> bool {
        recover(self.registry.lock()).remove_restricted_area(id)
    }

    pub fn get_area(&self, id: &str) -> Option<RestrictedArea> {
        recover(self.registry.lock()).get_area(id)
    }

    pub fn active_areas(&self) -> Vec<RestrictedArea> {
        recover(self.registry.lock()).get_active_areas()
    }

    pub fn areas_by_type(&self, area_type: AreaType) -> Vec<RestrictedArea> {
        recover(self.registry.lock()).get_areas_by_type(area_type)
    }

    pub fn distance_to_area(&self, point: &Waypoint, id: &str) -> Option<f64> {
        let registry = recover(self.registry.lock());
        registry
            .get_area(id)
            .map(|area| registry.calculate_distance_to_area(point, &area))
    }

    // === Overrides ===

    pub fn validate_override(&self, request: &OverrideRequest) -> OverrideValidation {
        recover(self.overrides.lock()).validate_override(request)
    }

    pub fn apply_override(
        &self,
        request: OverrideRequest,
    ) -> Result<SafetyOverride, SafetyError> {
        recover(self.overrides.lock()).apply_override(request)
    }

    pub fn is_warning_overridden(&self, warning_id: &str) -> bool {
        recover(self.overrides.lock()).is_warning_overridden(warning_id)
    }

    pub fn revoke_override(&self, id: &str, reason: &str) -> bool {
        recover(self.overrides.lock()).revoke_override(id, reason)
    }

    pub fn user_overrides(&self, user_id: &str) -> Vec<SafetyOverride> {
        recover(self.overrides.lock()).get_user_overrides(user_id)
    }

    pub fn override_statistics(&self) -> OverrideStatistics {
        recover(self.overrides.lock()).get_override_statistics()
    }

    pub fn cleanup_expired_overrides(&self) -> usize {
        recover(self.overrides.lock()).cleanup_expired_overrides()
    }

    // === Audit ===

    /// Run an audit append under the lock, then forward the entry to the
    /// durable sink without blocking the decision path.
    pub fn audit<F>(&self, log_fn: F) -> AuditLogEntry
    where
        F: FnOnce(&mut SafetyAuditLog) -> AuditLogEntry,
    {
        let entry = log_fn(&mut recover(self.audit.lock()));
        self.persist_audit(entry.clone());
        entry
    }

    pub fn recent_logs(&self, n: usize) -> Vec<AuditLogEntry> {
        recover(self.audit.lock()).get_recent_logs(n)
    }

    pub fn critical_logs(&self, n: usize) -> Vec<AuditLogEntry> {
        recover(self.audit.lock()).get_critical_logs(n)
    }

    pub fn logs_by_request(&self, request_id: &str) -> Vec<AuditLogEntry> {
        recover(self.audit.lock()).get_logs_by_request_id(request_id)
    }

    pub fn export_logs(&self) -> Vec<AuditLogEntry> {
        recover(self.audit.lock()).export_logs()
    }

    /// Fire-and-forget durable write. A failure is logged and discarded;
    /// the in-memory buffer stays the source of truth.
    fn persist_audit(&self, entry: AuditLogEntry) {
        if !self.config.audit_persist {
            return;
        }
        let Some(db) = &self.db else { return };
        let pool = db.pool().clone();
        tokio::spawn(async move {
            if let Err(err) = persistence::audit::insert_entry(&pool, &entry).await {
                tracing::error!(entry_id = %entry.id, "durable audit write failed: {err}");
            }
        });
    }
}

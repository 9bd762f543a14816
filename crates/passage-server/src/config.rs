//! Server configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    /// Seconds between lazy backing-store refreshes of the area catalog.
    pub area_refresh_secs: i64,
    /// Interpolation intervals per route segment in conflict checks.
    pub route_samples: usize,
    /// In-memory audit ring-buffer capacity.
    pub audit_capacity: usize,
    /// Whether audit entries are also written to the durable sink.
    pub audit_persist: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("PASSAGE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            database_path: env::var("PASSAGE_DB_PATH")
                .unwrap_or_else(|_| "data/passage.db".to_string()),
            database_max_connections: env::var("PASSAGE_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            area_refresh_secs: env::var("PASSAGE_AREA_REFRESH_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            route_samples: env::var("PASSAGE_ROUTE_SAMPLES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            audit_capacity: env::var("PASSAGE_AUDIT_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
            audit_persist: env::var("PASSAGE_AUDIT_PERSIST")
                .map(|s| s != "0" && !s.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
        }
    }
}

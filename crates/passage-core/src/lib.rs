pub mod areas;
pub mod audit;
pub mod depth;
pub mod error;
pub mod models;
pub mod overrides;
pub mod spatial;
pub mod weather;

pub use areas::{default_areas, RestrictedAreaRegistry, DEFAULT_ROUTE_SAMPLES};
pub use audit::{AuditAction, AuditLogEntry, AuditResult, SafetyAuditLog};
pub use depth::{DepthCalculation, DepthConfig, DepthSafetyEngine, DepthSeverity};
pub use error::SafetyError;
pub use models::{
    AreaSchedule, AreaType, CrewExperience, GeographicBounds, MarineObservation, RestrictedArea,
    Waypoint,
};
pub use overrides::{
    OverrideAuthority, OverrideRequest, OverrideStatistics, OverrideValidation, SafetyOverride,
};
pub use spatial::haversine_distance_nm;
pub use weather::{
    DelayRecommendation, PatternType, PredictedImpact, RecommendedAction, SevereWeatherPattern,
    WeatherPatternDetector, WeatherThresholds, WeatherWindow, WindowConfidence,
};

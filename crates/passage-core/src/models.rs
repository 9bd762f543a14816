//! Shared domain models for the passage-safety subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl Waypoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A rectangular lat/lon region.
///
/// Callers may pass degenerate bounds (north < south); containment and
/// overlap queries degrade to "no match" rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Category of a restricted area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaType {
    Military,
    MarineSanctuary,
    ShippingLane,
    SpeedRestricted,
    Other,
}

impl AreaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaType::Military => "military",
            AreaType::MarineSanctuary => "marine_sanctuary",
            AreaType::ShippingLane => "shipping_lane",
            AreaType::SpeedRestricted => "speed_restricted",
            AreaType::Other => "other",
        }
    }
}

impl std::str::FromStr for AreaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "military" => Ok(AreaType::Military),
            "marine_sanctuary" => Ok(AreaType::MarineSanctuary),
            "shipping_lane" => Ok(AreaType::ShippingLane),
            "speed_restricted" => Ok(AreaType::SpeedRestricted),
            "other" => Ok(AreaType::Other),
            _ => Err(format!("unknown area type '{s}'")),
        }
    }
}

/// When a restriction is in force.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaSchedule {
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    /// Free-text recurrence, e.g. "Seasonal: January 1 - May 15".
    #[serde(default)]
    pub recurring: Option<String>,
}

/// A geofenced area vessels must avoid or transit under restrictions.
///
/// Exactly one of `bounds`/`polygon` is normally populated. An area with
/// neither can never match a position; that is treated as "no conflict",
/// not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictedArea {
    pub id: String,
    pub name: String,
    pub area_type: AreaType,
    #[serde(default)]
    pub bounds: Option<GeographicBounds>,
    #[serde(default)]
    pub polygon: Option<Vec<Waypoint>>,
    pub description: String,
    #[serde(default)]
    pub restrictions: Vec<String>,
    pub active: bool,
    pub schedule: AreaSchedule,
    pub authority: String,
    #[serde(default)]
    pub penalty: Option<String>,
}

/// Crew experience level, used to scale required under-keel margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrewExperience {
    Novice,
    Intermediate,
    Advanced,
    Professional,
}

/// A single marine weather observation or forecast point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarineObservation {
    pub timestamp: DateTime<Utc>,
    pub location: Waypoint,
    pub wind_speed_kt: f64,
    pub wave_height_ft: f64,
    #[serde(default)]
    pub pressure_mb: Option<f64>,
    #[serde(default)]
    pub visibility_nm: Option<f64>,
}

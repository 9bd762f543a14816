//! Route and depth safety endpoints.
//!
//! The route handler is the orchestration point: it combines restricted
//! area conflicts, per-point grounding risk, and weather-pattern analysis
//! into hazards, warnings, and a single verdict, and writes every decision
//! through the audit log.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use passage_core::models::{CrewExperience, MarineObservation, Waypoint};
use passage_core::overrides::NON_OVERRIDABLE_TYPES;
use passage_core::{
    AreaType, DelayRecommendation, DepthCalculation, DepthSeverity, PatternType, RestrictedArea,
    SafetyError, SevereWeatherPattern,
};

use crate::api::request_id::RequestId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Charted depth at this point, if the caller has survey data for it.
    pub charted_depth_ft: Option<f64>,
    #[serde(default)]
    pub tidal_height_ft: f64,
}

#[derive(Debug, Deserialize)]
pub struct RouteSafetyRequest {
    pub waypoints: Vec<RoutePoint>,
    pub vessel_draft_ft: Option<f64>,
    pub crew_experience: Option<CrewExperience>,
    #[serde(default)]
    pub observations: Vec<MarineObservation>,
    pub planned_duration_hours: Option<usize>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Hazard {
    pub hazard_type: String,
    pub severity: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Waypoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Warning {
    pub warning_id: String,
    pub warning_type: String,
    pub severity: String,
    pub message: String,
    /// False for warning types that represent immediate danger.
    pub overridable: bool,
    /// True when an unexpired override already suppresses this warning.
    pub overridden: bool,
}

#[derive(Debug, Serialize)]
pub struct RouteSafetyResponse {
    pub request_id: String,
    pub verdict: String,
    pub safety_score: f64,
    pub hazards: Vec<Hazard>,
    pub warnings: Vec<Warning>,
    pub area_conflicts: Vec<RestrictedArea>,
    pub depth_checks: Vec<DepthCalculation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_pattern: Option<SevereWeatherPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_recommendation: Option<DelayRecommendation>,
}

pub(crate) fn bad_request(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn validate_coordinates(
    latitude: f64,
    longitude: f64,
    index: usize,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(bad_request(&format!(
            "waypoint {index}: latitude/longitude must be finite numbers"
        )));
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(bad_request(&format!(
            "waypoint {index}: latitude {latitude} out of range"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(bad_request(&format!(
            "waypoint {index}: longitude {longitude} out of range"
        )));
    }
    Ok(())
}

fn area_severity(area_type: AreaType) -> &'static str {
    match area_type {
        AreaType::Military => "critical",
        _ => "warning",
    }
}

fn area_score_deduction(area_type: AreaType) -> f64 {
    match area_type {
        AreaType::Military => 30.0,
        AreaType::MarineSanctuary => 15.0,
        AreaType::ShippingLane => 10.0,
        AreaType::SpeedRestricted => 5.0,
        AreaType::Other => 10.0,
    }
}

fn depth_score_deduction(severity: DepthSeverity) -> f64 {
    match severity {
        DepthSeverity::Critical => 40.0,
        DepthSeverity::High => 25.0,
        DepthSeverity::Moderate => 10.0,
        DepthSeverity::Safe => 0.0,
    }
}

fn pattern_score_deduction(pattern_type: PatternType) -> f64 {
    match pattern_type {
        PatternType::TropicalCyclone => 50.0,
        PatternType::GaleSeries => 30.0,
        PatternType::RapidPressureDrop => 20.0,
        PatternType::ColdFront => 10.0,
        PatternType::StormSystem => 25.0,
    }
}

pub async fn check_route_safety(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<RouteSafetyRequest>,
) -> Result<Json<RouteSafetyResponse>, (StatusCode, Json<serde_json::Value>)> {
    if req.waypoints.is_empty() {
        return Err(bad_request("route must contain at least one waypoint"));
    }
    for (index, point) in req.waypoints.iter().enumerate() {
        validate_coordinates(point.latitude, point.longitude, index)?;
    }
    if let Some(draft) = req.vessel_draft_ft {
        if !draft.is_finite() || draft <= 0.0 {
            return Err(bad_request("vessel draft must be a positive number"));
        }
    }

    let request_id = request_id.0;
    let user_id = req.user_id.as_deref();
    let waypoints: Vec<Waypoint> = req
        .waypoints
        .iter()
        .map(|p| Waypoint::new(p.latitude, p.longitude))
        .collect();

    state.ensure_fresh_areas().await;

    let mut hazards: Vec<Hazard> = Vec::new();
    let mut warnings: Vec<Warning> = Vec::new();
    let mut score = 100.0_f64;

    // Restricted areas along the route, including segment crossings
    let area_conflicts: Vec<RestrictedArea> =
        state.check_route(&waypoints).into_values().collect();
    for area in &area_conflicts {
        let severity = area_severity(area.area_type);
        score -= area_score_deduction(area.area_type);
        hazards.push(Hazard {
            hazard_type: "restricted_area".to_string(),
            severity: severity.to_string(),
            description: format!("Route passes through {} ({})", area.name, area.authority),
            location: None,
            area_id: Some(area.id.clone()),
        });
        warnings.push(make_warning(
            &state,
            "restricted_area",
            &area.id,
            severity,
            format!(
                "{}: {}",
                area.name,
                area.restrictions.join("; ")
            ),
        ));
    }

    // Per-point grounding risk where the caller supplied survey depths
    let mut depth_checks: Vec<DepthCalculation> = Vec::new();
    if let Some(draft) = req.vessel_draft_ft {
        for point in &req.waypoints {
            let Some(charted) = point.charted_depth_ft else {
                continue;
            };
            let calc = state
                .depth_engine()
                .calculate_depth_safety(
                    Waypoint::new(point.latitude, point.longitude),
                    charted,
                    draft,
                    point.tidal_height_ft,
                )
                .map_err(|err| match err {
                    SafetyError::InvalidInput(msg) => bad_request(&msg),
                    other => bad_request(&other.to_string()),
                })?;

            if calc.is_grounding_risk {
                score -= depth_score_deduction(calc.severity);
                hazards.push(Hazard {
                    hazard_type: "grounding_risk".to_string(),
                    severity: calc.severity.as_str().to_string(),
                    description: calc.recommendation.clone(),
                    location: Some(calc.location),
                    area_id: None,
                });
                let (warning_type, key) = if calc.severity == DepthSeverity::Critical {
                    ("grounding_imminent", location_key(&calc.location))
                } else {
                    ("shallow_water", location_key(&calc.location))
                };
                warnings.push(make_warning(
                    &state,
                    warning_type,
                    &key,
                    calc.severity.as_str(),
                    calc.recommendation.clone(),
                ));
            } else if let Some(level) = req.crew_experience {
                // Clearance meets the base minimum but may not meet the
                // margin scaled for crew experience.
                let adjusted = state
                    .depth_engine()
                    .adjust_for_crew_experience(calc.minimum_clearance_ft, level);
                if calc.clearance_available_ft < adjusted {
                    warnings.push(make_warning(
                        &state,
                        "crew_experience_margin",
                        &location_key(&calc.location),
                        "advisory",
                        format!(
                            "{:.1} ft clearance is under the {:.1} ft margin advised for a \
                             {:?} crew",
                            calc.clearance_available_ft, adjusted, level
                        ),
                    ));
                }
            }
            depth_checks.push(calc);
        }
    }

    // Weather-pattern analysis over caller-supplied observations
    let mut weather_pattern = None;
    let mut delay_recommendation = None;
    if !req.observations.is_empty() {
        state.audit(|log| log.log_data_source(&request_id, "caller_observations", "ok"));

        if let Some(pattern) = state.weather_detector().analyze_pattern(&req.observations) {
            let severity = if pattern.pattern_type == PatternType::TropicalCyclone {
                "critical"
            } else {
                "warning"
            };
            score -= pattern_score_deduction(pattern.pattern_type);
            hazards.push(Hazard {
                hazard_type: "severe_weather".to_string(),
                severity: severity.to_string(),
                description: format!("{}: {}", pattern.pattern_type.label(), pattern.intensity),
                location: None,
                area_id: None,
            });
            warnings.push(make_warning(
                &state,
                "severe_weather",
                pattern.pattern_type.label(),
                severity,
                format!("{}: {}", pattern.pattern_type.label(), pattern.intensity),
            ));
            weather_pattern = Some(pattern);
        }

        let delay = state
            .weather_detector()
            .recommend_delay(&req.observations, req.planned_duration_hours.unwrap_or(24));
        if delay.should_delay {
            let priority = match &weather_pattern {
                Some(p) if p.pattern_type == PatternType::TropicalCyclone => "critical",
                _ => "routine",
            };
            state.audit(|log| {
                log.log_recommendation(&request_id, user_id, priority, &delay.reason)
            });
        }
        delay_recommendation = Some(delay);
    }

    for hazard in &hazards {
        state.audit(|log| {
            log.log_hazard(
                &request_id,
                user_id,
                &hazard.hazard_type,
                &hazard.severity,
                json!({ "description": hazard.description, "area_id": hazard.area_id }),
            )
        });
    }
    for warning in &warnings {
        state.audit(|log| {
            log.log_warning(
                &request_id,
                user_id,
                &warning.warning_id,
                &warning.warning_type,
                &warning.severity,
                &warning.message,
            )
        });
    }
    state.audit(|log| {
        log.log_route_analysis(&request_id, user_id, req.waypoints.len(), hazards.len())
    });

    let safety_score = score.clamp(0.0, 100.0);
    let has_critical = hazards.iter().any(|h| h.severity == "critical");
    let verdict = if has_critical || safety_score < 50.0 {
        "unsafe"
    } else if !hazards.is_empty() || safety_score < 80.0 {
        "caution"
    } else {
        "safe"
    };

    Ok(Json(RouteSafetyResponse {
        request_id,
        verdict: verdict.to_string(),
        safety_score,
        hazards,
        warnings,
        area_conflicts,
        depth_checks,
        weather_pattern,
        delay_recommendation,
    }))
}

fn location_key(location: &Waypoint) -> String {
    format!("{:.4},{:.4}", location.latitude, location.longitude)
}

fn make_warning(
    state: &AppState,
    warning_type: &str,
    key: &str,
    severity: &str,
    message: String,
) -> Warning {
    let warning_id = format!("{warning_type}:{key}");
    let overridable = !NON_OVERRIDABLE_TYPES.contains(&warning_type);
    let overridden = overridable && state.is_warning_overridden(&warning_id);
    Warning {
        warning_id,
        warning_type: warning_type.to_string(),
        severity: severity.to_string(),
        message,
        overridable,
        overridden,
    }
}

// === Single-point depth check ===

#[derive(Debug, Deserialize)]
pub struct DepthCheckRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub charted_depth_ft: f64,
    pub vessel_draft_ft: f64,
    #[serde(default)]
    pub tidal_height_ft: f64,
    pub crew_experience: Option<CrewExperience>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DepthCheckResponse {
    pub request_id: String,
    pub calculation: DepthCalculation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crew_adjusted_minimum_ft: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meets_crew_margin: Option<bool>,
    pub minimum_safe_depth_ft: f64,
}

pub async fn check_depth_safety(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<DepthCheckRequest>,
) -> Result<Json<DepthCheckResponse>, (StatusCode, Json<serde_json::Value>)> {
    validate_coordinates(req.latitude, req.longitude, 0)?;

    let request_id = request_id.0;
    let user_id = req.user_id.as_deref();
    let engine = state.depth_engine();

    let calculation = engine
        .calculate_depth_safety(
            Waypoint::new(req.latitude, req.longitude),
            req.charted_depth_ft,
            req.vessel_draft_ft,
            req.tidal_height_ft,
        )
        .map_err(|err| bad_request(&err.to_string()))?;

    let crew_adjusted_minimum_ft = req
        .crew_experience
        .map(|level| engine.adjust_for_crew_experience(calculation.minimum_clearance_ft, level));
    let meets_crew_margin =
        crew_adjusted_minimum_ft.map(|min| calculation.clearance_available_ft >= min);

    if calculation.is_grounding_risk {
        state.audit(|log| {
            log.log_hazard(
                &request_id,
                user_id,
                "grounding_risk",
                calculation.severity.as_str(),
                json!({
                    "location": calculation.location,
                    "clearance_available_ft": calculation.clearance_available_ft,
                    "minimum_clearance_ft": calculation.minimum_clearance_ft,
                }),
            )
        });
    } else {
        state.audit(|log| {
            log.log_recommendation(&request_id, user_id, "routine", &calculation.recommendation)
        });
    }

    Ok(Json(DepthCheckResponse {
        request_id,
        minimum_safe_depth_ft: engine.calculate_minimum_safe_depth(req.vessel_draft_ft),
        calculation,
        crew_adjusted_minimum_ft,
        meets_crew_margin,
    }))
}

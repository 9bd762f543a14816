//! Restricted-area endpoints: conflict checks and catalog CRUD.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use passage_core::models::{
    AreaSchedule, AreaType, GeographicBounds, RestrictedArea, Waypoint,
};

use crate::api::request_id::RequestId;
use crate::api::safety::bad_request;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AreaCheckRequest {
    pub waypoints: Vec<Waypoint>,
}

#[derive(Debug, Serialize)]
pub struct AreaCheckResponse {
    pub request_id: String,
    pub conflicts: Vec<RestrictedArea>,
    pub count: usize,
}

/// Check a list of waypoints (and the segments between them) against the
/// active catalog.
pub async fn check_waypoints(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<AreaCheckRequest>,
) -> Result<Json<AreaCheckResponse>, (StatusCode, Json<serde_json::Value>)> {
    if req.waypoints.is_empty() {
        return Err(bad_request("at least one waypoint is required"));
    }
    for (index, point) in req.waypoints.iter().enumerate() {
        if !(-90.0..=90.0).contains(&point.latitude)
            || !(-180.0..=180.0).contains(&point.longitude)
        {
            return Err(bad_request(&format!(
                "waypoint {index}: coordinates out of range"
            )));
        }
    }

    state.ensure_fresh_areas().await;
    let conflicts: Vec<RestrictedArea> = state.check_route(&req.waypoints).into_values().collect();

    let request_id = request_id.0;
    state.audit(|log| {
        log.log_route_analysis(&request_id, None, req.waypoints.len(), conflicts.len())
    });

    Ok(Json(AreaCheckResponse {
        request_id,
        count: conflicts.len(),
        conflicts,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateAreaRequest {
    pub name: String,
    pub area_type: AreaType,
    pub bounds: Option<GeographicBounds>,
    pub polygon: Option<Vec<Waypoint>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub restrictions: Vec<String>,
    pub schedule: Option<AreaSchedule>,
    pub authority: String,
    pub penalty: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateAreaResponse {
    #[serde(flatten)]
    pub area: RestrictedArea,
    /// Whether the area also reached the backing store.
    pub persisted: bool,
}

/// Create a new restricted area.
pub async fn create_area(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAreaRequest>,
) -> (StatusCode, Json<CreateAreaResponse>) {
    let area = RestrictedArea {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        area_type: req.area_type,
        bounds: req.bounds,
        polygon: req.polygon,
        description: req.description,
        restrictions: req.restrictions,
        active: true,
        schedule: req.schedule.unwrap_or(AreaSchedule {
            start: Utc::now(),
            end: None,
            recurring: None,
        }),
        authority: req.authority,
        penalty: req.penalty,
    };

    state.add_area(area.clone());
    tracing::info!("Created restricted area '{}' ({})", area.name, area.id);

    // Mirror to the store so the area survives the next catalog refresh.
    // Store failures never break the in-memory catalog.
    let mut persisted = false;
    if let Some(db) = state.db() {
        match crate::persistence::areas::upsert_area(db.pool(), &area).await {
            Ok(()) => persisted = true,
            Err(err) => tracing::error!("failed to persist area {}: {err}", area.id),
        }
    }

    (StatusCode::CREATED, Json(CreateAreaResponse { area, persisted }))
}

#[derive(Debug, Deserialize)]
pub struct ListAreasQuery {
    pub area_type: Option<String>,
}

/// List active areas, optionally filtered by type.
pub async fn list_areas(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAreasQuery>,
) -> Result<Json<Vec<RestrictedArea>>, (StatusCode, Json<serde_json::Value>)> {
    state.ensure_fresh_areas().await;

    match query.area_type.as_deref() {
        Some(raw) => {
            let area_type: AreaType = raw.parse().map_err(|err: String| bad_request(&err))?;
            Ok(Json(state.areas_by_type(area_type)))
        }
        None => Ok(Json(state.active_areas())),
    }
}

/// Get a specific area by id.
pub async fn get_area(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RestrictedArea>, StatusCode> {
    state.get_area(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Delete an area by id, from memory and the store.
pub async fn delete_area(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    let removed = state.remove_area(&id);

    if let Some(db) = state.db() {
        if let Err(err) = crate::persistence::areas::delete_area(db.pool(), &id).await {
            tracing::error!("failed to delete area {id} from store: {err}");
        }
    }

    if removed {
        tracing::info!("Deleted restricted area {}", id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, Deserialize)]
pub struct DistanceQuery {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct DistanceResponse {
    pub area_id: String,
    /// Nautical miles to the nearest edge; zero inside, absent when the
    /// area has no geometry.
    pub distance_nm: Option<f64>,
}

/// Distance from a position to an area's nearest edge.
pub async fn distance_to_area(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<DistanceQuery>,
) -> Result<Json<DistanceResponse>, StatusCode> {
    let point = Waypoint::new(query.latitude, query.longitude);
    match state.distance_to_area(&point, &id) {
        Some(distance) => Ok(Json(DistanceResponse {
            area_id: id,
            distance_nm: distance.is_finite().then_some(distance),
        })),
        None => Err(StatusCode::NOT_FOUND),
    }
}

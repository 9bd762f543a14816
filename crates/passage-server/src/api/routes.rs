//! REST API routes.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::api::{areas, audit, overrides, request_id, safety};
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        // Safety decision surface
        .route("/v1/safety/route", post(safety::check_route_safety))
        .route("/v1/safety/depth", post(safety::check_depth_safety))
        // Restricted-area catalog
        .route("/v1/areas/check", post(areas::check_waypoints))
        .route("/v1/areas", post(areas::create_area).get(areas::list_areas))
        .route("/v1/areas/:id", get(areas::get_area).delete(areas::delete_area))
        .route("/v1/areas/:id/distance", get(areas::distance_to_area))
        // Overrides
        .route(
            "/v1/overrides",
            post(overrides::apply_override).get(overrides::list_user_overrides),
        )
        .route("/v1/overrides/validate", post(overrides::validate_override))
        .route("/v1/overrides/statistics", get(overrides::statistics))
        .route("/v1/overrides/cleanup", post(overrides::cleanup))
        .route("/v1/overrides/check/:warning_id", get(overrides::check_warning))
        .route("/v1/overrides/:id", delete(overrides::revoke))
        // Audit queries
        .route("/v1/audit/recent", get(audit::recent))
        .route("/v1/audit/critical", get(audit::critical))
        .route("/v1/audit/overrides", get(audit::overrides))
        .route("/v1/audit/requests/:request_id", get(audit::by_request))
        .layer(middleware::from_fn(request_id::ensure_request_id))
}

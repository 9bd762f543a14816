//! API routes for the passage safety server.

pub mod areas;
pub mod audit;
pub mod overrides;
pub mod request_id;
mod routes;
pub mod safety;

use axum::Router;

pub fn routes() -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}

//! Passage safety server - always-on backend for route safety decisions

mod api;
mod config;
mod persistence;
mod state;

use anyhow::Result;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("passage_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting passage safety server...");

    let config = Config::from_env();
    let port = config.server_port;

    // A missing database is survivable: the hardcoded area defaults and the
    // in-memory audit buffer carry the safety path on their own.
    let db = match persistence::init_database(
        &config.database_path,
        config.database_max_connections,
    )
    .await
    {
        Ok(db) => Some(db),
        Err(err) => {
            tracing::error!("Database unavailable, running with in-memory state only: {err}");
            None
        }
    };

    let state = Arc::new(AppState::new(config, db));

    // Build the app
    let app = api::routes()
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(CorsLayer::permissive());

    // Run server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

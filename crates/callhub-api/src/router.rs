//! Route definitions for the CallHub HTTP surface.
//!
//! The WebSocket endpoint is mounted at the configured path; everything else
//! lives under `/api`.

use axum::{Router, routing::get};

use crate::handlers;
use crate::state::AppState;

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let ws_path = state.config.server.ws_path.clone();

    let api_routes = Router::new()
        .merge(health_routes())
        .merge(presence_routes());

    Router::new()
        .nest("/api", api_routes)
        .route(&ws_path, get(handlers::ws::ws_handler))
        .with_state(state)
}

/// Health check endpoints
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}

/// Presence endpoints
fn presence_routes() -> Router<AppState> {
    Router::new().route("/presence", get(handlers::presence::online_users))
}

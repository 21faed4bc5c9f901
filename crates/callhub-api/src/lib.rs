//! # callhub-api
//!
//! HTTP layer for CallHub built on Axum.
//!
//! Mounts the WebSocket signaling endpoint, the health and presence routes,
//! the CORS and request-tracing layers, and maps `AppError` to JSON
//! responses.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use state::AppState;

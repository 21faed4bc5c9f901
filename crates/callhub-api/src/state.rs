//! Application state shared across all handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use callhub_core::config::AppConfig;
use callhub_realtime::connection::authenticator::WsAuthenticator;
use callhub_realtime::server::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// WebSocket signaling engine
    pub realtime: Arc<RealtimeEngine>,
    /// Upgrade token checker
    pub authenticator: Arc<WsAuthenticator>,
    /// Process start, for uptime reporting
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Builds the engine and authenticator from configuration.
    pub fn new(config: AppConfig) -> Self {
        let realtime = Arc::new(RealtimeEngine::new(
            config.realtime.clone(),
            config.signaling.clone(),
        ));
        let authenticator = Arc::new(WsAuthenticator::new(&config.auth));

        Self {
            config: Arc::new(config),
            realtime,
            authenticator,
            started_at: Utc::now(),
        }
    }

    /// Seconds since the state was built.
    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}

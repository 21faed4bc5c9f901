//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info};

use callhub_core::config::{RealtimeConfig, SignalingConfig};
use callhub_core::error::AppError;

use crate::connection::manager::ConnectionManager;
use crate::connection::pool::ConnectionPool;
use crate::metrics::RealtimeMetrics;
use crate::presence::registry::PresenceRegistry;
use crate::signaling::router::CallRouter;
use crate::signaling::session::CallSessionTracker;

/// Central real-time engine that coordinates all WebSocket subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Presence registry.
    pub presence: Arc<PresenceRegistry>,
    /// Call router.
    pub router: Arc<CallRouter>,
    /// Call sessions (empty unless tracking is on).
    pub sessions: Arc<CallSessionTracker>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    signaling: SignalingConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(config: RealtimeConfig, signaling: SignalingConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let metrics = Arc::new(RealtimeMetrics::new());
        let pool = Arc::new(ConnectionPool::new());
        let presence = Arc::new(PresenceRegistry::new(pool.clone(), metrics.clone()));
        let sessions = Arc::new(CallSessionTracker::new());
        let router = Arc::new(CallRouter::new(
            signaling.clone(),
            presence.clone(),
            pool.clone(),
            sessions.clone(),
            metrics.clone(),
        ));
        let connections = Arc::new(ConnectionManager::new(
            config,
            pool,
            presence.clone(),
            router.clone(),
            metrics.clone(),
        ));

        info!(
            validate_participants = signaling.validate_participants,
            track_sessions = signaling.track_sessions,
            failure_acks = signaling.failure_acks,
            "Real-time engine initialized"
        );

        Self {
            connections,
            presence,
            router,
            sessions,
            metrics,
            signaling,
            shutdown_tx,
        }
    }

    /// Starts background tasks. Only the ring-timeout sweeper exists, and
    /// only when session tracking is on.
    pub fn spawn_background(&self) {
        if !self.signaling.track_sessions {
            return;
        }

        let router = self.router.clone();
        let mut shutdown = self.shutdown_receiver();
        let period = Duration::from_secs(self.signaling.sweep_interval_seconds.max(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = interval.tick() => {
                        let reclaimed = router.sweep_expired().await;
                        if reclaimed > 0 {
                            debug!(reclaimed, "Swept expired ringing calls");
                        }
                    }
                }
            }
            debug!("Call sweeper stopped");
        });
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        info!("Shutting down real-time engine");

        // Signal all tasks to stop
        let _ = self.shutdown_tx.send(());

        self.connections.close_all().await;

        info!("Real-time engine shut down");
        Ok(())
    }
}

//! Connection manager. Handles connection lifecycle (register, teardown,
//! inbound dispatch).

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use callhub_core::config::RealtimeConfig;
use callhub_core::types::{ConnectionId, UserId};

use crate::message::serializer::deserialize_inbound;
use crate::message::types::{InboundMessage, OutboundMessage};
use crate::message::validator::validate_inbound;
use crate::metrics::RealtimeMetrics;
use crate::presence::registry::PresenceRegistry;
use crate::signaling::router::CallRouter;

use super::handle::ConnectionHandle;
use super::heartbeat::HeartbeatConfig;
use super::pool::ConnectionPool;

/// Manages all active WebSocket connections.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Presence registry.
    presence: Arc<PresenceRegistry>,
    /// Call router.
    router: Arc<CallRouter>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
    /// Configuration.
    config: RealtimeConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        pool: Arc<ConnectionPool>,
        presence: Arc<PresenceRegistry>,
        router: Arc<CallRouter>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            pool,
            presence,
            router,
            metrics,
            config,
        }
    }

    /// Registers a new connection.
    ///
    /// `authenticated_user` is the id proven by an upgrade token, if token
    /// auth is on. Returns the connection handle and a receiver for outbound
    /// messages.
    pub fn register(
        &self,
        authenticated_user: Option<UserId>,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(authenticated_user, tx));

        self.pool.add(handle.clone());
        self.metrics.connection_opened();

        info!(
            conn_id = %handle.id,
            authenticated = authenticated_user.is_some(),
            "WebSocket connection registered"
        );

        (handle, rx)
    }

    /// Tears a connection down: removes it from the pool, withdraws its
    /// presence, and forgets call sessions of a user who went fully offline.
    ///
    /// Only the first call for a connection does anything; returns whether
    /// this call did the teardown.
    pub async fn unregister(&self, conn_id: &ConnectionId) -> bool {
        let Some(handle) = self.pool.remove(conn_id) else {
            return false;
        };
        handle.close();

        if let Some(outcome) = self.presence.withdraw(*conn_id).await {
            if !outcome.still_online {
                self.router.user_offline(outcome.user_id);
            }
        }

        self.metrics.connection_closed();
        info!(conn_id = %conn_id, "WebSocket connection unregistered");
        true
    }

    /// Processes an inbound text frame from a client.
    ///
    /// Malformed or invalid frames are logged and dropped; the connection
    /// stays open.
    pub async fn handle_inbound(&self, conn_id: &ConnectionId, raw_message: &str) {
        let handle = match self.pool.get(conn_id) {
            Some(h) => h,
            None => {
                warn!(conn_id = %conn_id, "Message from unknown connection");
                return;
            }
        };

        handle.touch().await;
        self.metrics.event_received();

        let msg = match deserialize_inbound(raw_message, self.config.max_message_bytes)
            .and_then(|msg| validate_inbound(&msg).map(|_| msg))
        {
            Ok(m) => m,
            Err(e) => {
                self.metrics.malformed_frame();
                warn!(conn_id = %conn_id, error = %e, "Dropping invalid frame");
                return;
            }
        };

        debug!(conn_id = %conn_id, event = msg.event_name(), "Inbound event");
        self.dispatch(&handle, msg).await;
    }

    async fn dispatch(&self, handle: &ConnectionHandle, msg: InboundMessage) {
        match msg {
            InboundMessage::UserConnected(announce) => {
                if let Some(proven) = handle.authenticated_user {
                    if proven != announce.user_id {
                        self.metrics.event_dropped();
                        warn!(
                            conn_id = %handle.id,
                            token_user = %proven,
                            announced_user = %announce.user_id,
                            "Announcement does not match token identity, dropping"
                        );
                        return;
                    }
                }
                if let Err(e) = self
                    .presence
                    .announce(handle.id, announce.user_id, &announce.username)
                    .await
                {
                    warn!(conn_id = %handle.id, error = %e, "Announcement rejected");
                }
            }
            InboundMessage::InitiateCall(call) => {
                self.router
                    .initiate(handle.id, call.caller_id, &call.caller_username, call.callee_id)
                    .await;
            }
            InboundMessage::CallRejected(reject) => {
                self.router
                    .reject(handle.id, reject.caller_id, &reject.message)
                    .await;
            }
            InboundMessage::AcceptCall(accept) => {
                self.router
                    .accept(
                        handle.id,
                        accept.caller_id,
                        accept.callee_id,
                        &accept.callee_username,
                    )
                    .await;
            }
            InboundMessage::Pong { .. } => {}
        }
    }

    /// Closes and tears down every connection.
    pub async fn close_all(&self) {
        let all = self.pool.all_connections();
        for conn in &all {
            self.unregister(&conn.id).await;
        }
        info!(count = all.len(), "All connections closed");
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Heartbeat settings for new connections.
    pub fn heartbeat_config(&self) -> HeartbeatConfig {
        HeartbeatConfig::from(&self.config)
    }
}

/// Runs [`ConnectionManager::unregister`] when the socket task ends, however
/// it ends.
///
/// Call [`finish`](Self::finish) on the normal path; if the task is dropped
/// instead (panic, abort), the drop spawns the teardown.
#[derive(Debug)]
pub struct TeardownGuard {
    manager: Arc<ConnectionManager>,
    conn_id: ConnectionId,
    armed: bool,
}

impl TeardownGuard {
    /// Arms a guard for `conn_id`.
    pub fn new(manager: Arc<ConnectionManager>, conn_id: ConnectionId) -> Self {
        Self {
            manager,
            conn_id,
            armed: true,
        }
    }

    /// Tears the connection down now.
    pub async fn finish(mut self) {
        self.armed = false;
        self.manager.unregister(&self.conn_id).await;
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let manager = self.manager.clone();
        let conn_id = self.conn_id;
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn(async move {
                    manager.unregister(&conn_id).await;
                });
            }
            Err(_) => {
                warn!(conn_id = %conn_id, "No runtime to tear down connection");
            }
        }
    }
}

//! Ping/pong heartbeat for WebSocket keepalive.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;

use callhub_core::config::RealtimeConfig;

use crate::message::types::OutboundMessage;

use super::handle::ConnectionHandle;

/// Heartbeat configuration
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Extra time a client gets to answer before it is considered dead
    pub ping_timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.ping_interval_seconds.max(1)),
            ping_timeout: Duration::from_secs(config.ping_timeout_seconds),
        }
    }
}

/// Run heartbeat loop for a connection.
///
/// Queues a ping every interval; the socket task writes it as a protocol
/// Ping frame, and the client's automatic Pong counts as activity. A
/// connection with no inbound activity for longer than
/// `ping_interval + ping_timeout` is closed, which makes the socket task run
/// its normal teardown. Ends when the connection is closed.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, config: HeartbeatConfig) {
    let closed = handle.closed_token();
    let mut interval = time::interval_at(
        time::Instant::now() + config.ping_interval,
        config.ping_interval,
    );
    let deadline = config.ping_interval + config.ping_timeout;

    loop {
        tokio::select! {
            _ = closed.cancelled() => break,
            _ = interval.tick() => {}
        }

        if !handle.is_alive() {
            break;
        }

        let idle = Utc::now() - handle.last_activity().await;
        if let Ok(idle) = idle.to_std() {
            if idle > deadline {
                tracing::warn!(
                    conn_id = %handle.id,
                    idle_secs = idle.as_secs(),
                    "Heartbeat timeout, closing connection"
                );
                handle.close();
                break;
            }
        }

        let ping = OutboundMessage::Ping {
            timestamp: Utc::now().timestamp_millis(),
        };
        if !handle.send(ping) && !handle.is_alive() {
            tracing::debug!(conn_id = %handle.id, "Ping send failed, connection is gone");
            handle.close();
            break;
        }
    }

    tracing::debug!(conn_id = %handle.id, "Heartbeat loop ended");
}

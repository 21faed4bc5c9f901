//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;

use callhub_core::types::{ConnectionId, UserId};

use crate::message::types::OutboundMessage;

/// A handle to a single WebSocket connection.
///
/// Holds the sender for pushing messages to the client plus liveness
/// bookkeeping. The identity a connection announces is not stored here: it
/// lives in the presence registry, which owns room membership.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User id proven by an upgrade token, when token auth is on
    pub authenticated_user: Option<UserId>,
    /// Sender for outbound messages
    sender: mpsc::Sender<OutboundMessage>,
    /// Last inbound frame (any event, including pong)
    pub last_activity: RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive
    alive: AtomicBool,
    /// Fired when the server wants the socket closed
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(authenticated_user: Option<UserId>, sender: mpsc::Sender<OutboundMessage>) -> Self {
        Self {
            id: ConnectionId::new(),
            authenticated_user,
            sender,
            last_activity: RwLock::new(Utc::now()),
            alive: AtomicBool::new(true),
            closed: CancellationToken::new(),
        }
    }

    /// Queue an outbound message for this connection.
    ///
    /// Fire-and-forget: a full queue drops the message, a closed queue marks
    /// the connection dead. Returns whether the message was queued.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!(
                    conn_id = %self.id,
                    event = msg.event_name(),
                    "Send buffer full, dropping message"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Mark dead and ask the socket task to close.
    pub fn close(&self) {
        self.mark_dead();
        self.closed.cancel();
    }

    /// Token that is cancelled once [`close`](Self::close) is called.
    pub fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Update last activity timestamp
    pub async fn touch(&self) {
        let mut la = self.last_activity.write().await;
        *la = Utc::now();
    }

    /// Time of the last inbound frame.
    pub async fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.read().await
    }
}

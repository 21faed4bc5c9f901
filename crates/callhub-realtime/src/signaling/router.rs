//! Call signaling router. Relays initiate/accept/reject between rooms.
//!
//! By default the router is stateless: it checks only that the addressed
//! room has members and forwards. [`SignalingConfig`] can turn on sender
//! validation, per-call session tracking, and failure acknowledgements.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use callhub_core::config::{MAX_RING_TIMEOUT_SECONDS, SignalingConfig};
use callhub_core::types::{ConnectionId, UserId};

use crate::connection::pool::ConnectionPool;
use crate::message::types::{CallAccepted, CallFailed, CallRejected, IncomingCall, OutboundMessage};
use crate::metrics::RealtimeMetrics;
use crate::presence::registry::PresenceRegistry;

use super::session::CallSessionTracker;

/// Why an event was not relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The addressed room has no members.
    RecipientOffline,
    /// The sending connection is not announced as the sender-side identity.
    SenderNotAnnounced,
    /// Session tracking found no ringing call for the pair.
    NoPendingCall,
    /// An id in the payload cannot address a user.
    InvalidPayload,
}

/// What happened to a relayed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Queued for this many connections.
    Delivered(usize),
    /// Not relayed.
    Dropped(DropReason),
}

/// Relays call negotiation events between per-user rooms.
#[derive(Debug)]
pub struct CallRouter {
    presence: Arc<PresenceRegistry>,
    pool: Arc<ConnectionPool>,
    sessions: Arc<CallSessionTracker>,
    metrics: Arc<RealtimeMetrics>,
    config: SignalingConfig,
}

impl CallRouter {
    /// Creates a router over the given registry and pool.
    pub fn new(
        config: SignalingConfig,
        presence: Arc<PresenceRegistry>,
        pool: Arc<ConnectionPool>,
        sessions: Arc<CallSessionTracker>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            presence,
            pool,
            sessions,
            metrics,
            config,
        }
    }

    /// Rings `callee_id` on behalf of `caller_id`.
    pub async fn initiate(
        &self,
        sender: ConnectionId,
        caller_id: UserId,
        caller_name: &str,
        callee_id: UserId,
    ) -> RelayOutcome {
        info!(caller_id = %caller_id, callee_id = %callee_id, "Initiating call");

        if !caller_id.is_valid() || !callee_id.is_valid() {
            return self.drop_event("initiateCall", DropReason::InvalidPayload);
        }
        if self.config.validate_participants && !self.sender_is(sender, caller_id).await {
            return self.drop_event("initiateCall", DropReason::SenderNotAnnounced);
        }

        let members = self.presence.members(callee_id).await;
        if members.is_empty() {
            info!(
                callee_id = %callee_id,
                "Room for callee does not exist, cannot emit incoming call"
            );
            if self.config.failure_acks {
                let failed = OutboundMessage::CallFailed(CallFailed {
                    callee_id,
                    reason: "offline".to_string(),
                });
                let sent = self.pool.send_to(&[sender], &failed);
                self.metrics.events_relayed(sent as u64);
            }
            return self.drop_event("initiateCall", DropReason::RecipientOffline);
        }

        if self.config.track_sessions {
            self.sessions.ring(caller_id, callee_id);
        }

        let message = OutboundMessage::IncomingCall(IncomingCall {
            from: caller_id,
            username: caller_name.to_string(),
        });
        let outcome = self.deliver(&members, &message);
        info!(callee_id = %callee_id, "Incoming call event emitted to callee room");
        outcome
    }

    /// Tells `caller_id` that `callee_id` picked up.
    pub async fn accept(
        &self,
        sender: ConnectionId,
        caller_id: UserId,
        callee_id: UserId,
        callee_name: &str,
    ) -> RelayOutcome {
        if !caller_id.is_valid() || !callee_id.is_valid() {
            return self.drop_event("acceptCall", DropReason::InvalidPayload);
        }
        if self.config.validate_participants && !self.sender_is(sender, callee_id).await {
            return self.drop_event("acceptCall", DropReason::SenderNotAnnounced);
        }
        if self.config.track_sessions && !self.sessions.connect(caller_id, callee_id) {
            return self.drop_event("acceptCall", DropReason::NoPendingCall);
        }

        let message = OutboundMessage::CallAccepted(CallAccepted {
            by: callee_id,
            username: callee_name.to_string(),
        });
        self.deliver_to_room(caller_id, &message).await
    }

    /// Tells `caller_id` that the call was declined.
    ///
    /// Delivered to the caller's room. The callee is the identity the
    /// sending connection announced, which is only needed for session
    /// tracking.
    pub async fn reject(
        &self,
        sender: ConnectionId,
        caller_id: UserId,
        message: &str,
    ) -> RelayOutcome {
        if !caller_id.is_valid() {
            return self.drop_event("callRejected", DropReason::InvalidPayload);
        }

        if self.config.validate_participants || self.config.track_sessions {
            let Some((callee_id, _)) = self.presence.binding(sender).await else {
                return self.drop_event("callRejected", DropReason::SenderNotAnnounced);
            };
            if self.config.track_sessions && !self.sessions.reject(caller_id, callee_id) {
                return self.drop_event("callRejected", DropReason::NoPendingCall);
            }
        }

        let notice = OutboundMessage::CallRejected(CallRejected {
            message: message.to_string(),
        });
        self.deliver_to_room(caller_id, &notice).await
    }

    /// Forget tracked calls of a user who went fully offline.
    pub fn user_offline(&self, user_id: UserId) {
        let cleared = self.sessions.clear_user(user_id);
        if cleared > 0 {
            debug!(user_id = %user_id, cleared, "Cleared call sessions of offline user");
        }
    }

    /// Reclaims ringing calls that outlived the ring timeout. Returns how
    /// many were reclaimed.
    pub async fn sweep_expired(&self) -> usize {
        let secs = self.config.ring_timeout_seconds.clamp(1, MAX_RING_TIMEOUT_SECONDS);
        let timeout = Duration::seconds(secs as i64);
        let expired = self.sessions.reclaim_expired(Utc::now(), timeout);

        for session in &expired {
            info!(
                caller_id = %session.caller,
                callee_id = %session.callee,
                "Ringing call timed out"
            );
            if self.config.failure_acks {
                let failed = OutboundMessage::CallFailed(CallFailed {
                    callee_id: session.callee,
                    reason: "timeout".to_string(),
                });
                self.deliver_to_room(session.caller, &failed).await;
            }
        }

        expired.len()
    }

    /// The session table (shared with the engine's sweeper).
    pub fn sessions(&self) -> &Arc<CallSessionTracker> {
        &self.sessions
    }

    async fn sender_is(&self, sender: ConnectionId, expected: UserId) -> bool {
        matches!(self.presence.binding(sender).await, Some((id, _)) if id == expected)
    }

    async fn deliver_to_room(&self, room: UserId, message: &OutboundMessage) -> RelayOutcome {
        let members = self.presence.members(room).await;
        if members.is_empty() {
            info!(
                room = %room,
                event = message.event_name(),
                "Target room has no members, dropping event"
            );
            return self.drop_event(message.event_name(), DropReason::RecipientOffline);
        }
        self.deliver(&members, message)
    }

    fn deliver(&self, members: &[ConnectionId], message: &OutboundMessage) -> RelayOutcome {
        let sent = self.pool.send_to(members, message);
        self.metrics.events_relayed(sent as u64);
        debug!(event = message.event_name(), recipients = sent, "Relayed event");
        RelayOutcome::Delivered(sent)
    }

    fn drop_event(&self, event: &str, reason: DropReason) -> RelayOutcome {
        self.metrics.event_dropped();
        warn!(event = %event, reason = ?reason, "Dropped call event");
        RelayOutcome::Dropped(reason)
    }
}

//! Presence registry: who is online, which connections speak for them,
//! and the snapshot broadcast that follows every change.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use callhub_core::error::AppError;
use callhub_core::result::AppResult;
use callhub_core::types::{ConnectionId, UserId};

use crate::connection::pool::ConnectionPool;
use crate::message::types::{OutboundMessage, PresenceSnapshot};
use crate::message::validator::validate_username;
use crate::metrics::RealtimeMetrics;
use crate::room::RoomTable;

use super::entry::{AnnounceOutcome, PresenceEntry, WithdrawOutcome};

/// Presence entries and room membership, always mutated together.
#[derive(Debug, Default)]
struct PresenceState {
    /// User id → entry.
    entries: BTreeMap<UserId, PresenceEntry>,
    /// Per-user rooms.
    rooms: RoomTable,
    /// Announcement counter.
    seq: u64,
}

impl PresenceState {
    fn snapshot(&self) -> PresenceSnapshot {
        self.entries
            .iter()
            .map(|(id, entry)| (*id, entry.username.clone()))
            .collect()
    }

    /// Fix up the entry for `user` after `conn_id` left its room.
    ///
    /// An entry owned by another connection is left alone. An entry owned by
    /// the departed connection falls back to the newest remaining member, or
    /// is removed when the room is empty.
    fn release(&mut self, user: UserId, conn_id: ConnectionId) {
        let owned = self
            .entries
            .get(&user)
            .is_some_and(|entry| entry.owner == conn_id);
        if !owned {
            return;
        }

        let fallback = self
            .rooms
            .latest_member(user)
            .map(|(owner, m)| (owner, m.username.clone()));
        match fallback {
            Some((owner, username)) => {
                self.entries.insert(
                    user,
                    PresenceEntry {
                        user_id: user,
                        username,
                        owner,
                    },
                );
            }
            None => {
                self.entries.remove(&user);
            }
        }
    }
}

/// Authoritative map of online users plus the per-user rooms.
///
/// All mutations run under one mutex and broadcast the resulting snapshot
/// before releasing it, so clients see snapshots in mutation order.
#[derive(Debug)]
pub struct PresenceRegistry {
    state: Mutex<PresenceState>,
    pool: Arc<ConnectionPool>,
    metrics: Arc<RealtimeMetrics>,
}

impl PresenceRegistry {
    /// Creates an empty registry that broadcasts through `pool`.
    pub fn new(pool: Arc<ConnectionPool>, metrics: Arc<RealtimeMetrics>) -> Self {
        Self {
            state: Mutex::new(PresenceState::default()),
            pool,
            metrics,
        }
    }

    /// Binds `conn_id` to `user_id`, moves it into that user's room, and
    /// records the user as online under `username` (last writer wins).
    ///
    /// Fails with `NotFound` once the connection has left the pool.
    pub async fn announce(
        &self,
        conn_id: ConnectionId,
        user_id: UserId,
        username: &str,
    ) -> AppResult<AnnounceOutcome> {
        if !user_id.is_valid() {
            return Err(AppError::validation(format!(
                "userId must be a positive integer, got {user_id}"
            )));
        }
        validate_username(username)?;

        let mut state = self.state.lock().await;
        // Teardown removes the connection from the pool before it withdraws
        // under this lock, so a late announce cannot outlive the withdraw.
        if self.pool.get(&conn_id).is_none() {
            return Err(AppError::not_found(format!(
                "connection {conn_id} is no longer registered"
            )));
        }
        state.seq += 1;
        let seq = state.seq;

        let previous = state
            .rooms
            .join(conn_id, user_id, username.to_string(), seq);
        let left_room = match previous {
            Some(membership) if membership.room != user_id => {
                state.release(membership.room, conn_id);
                Some(membership.room)
            }
            _ => None,
        };

        let superseded = state
            .entries
            .insert(
                user_id,
                PresenceEntry {
                    user_id,
                    username: username.to_string(),
                    owner: conn_id,
                },
            )
            .map(|entry| entry.owner)
            .filter(|owner| *owner != conn_id);

        self.broadcast_locked(&state);
        drop(state);

        if let Some(previous_owner) = superseded {
            debug!(
                conn_id = %conn_id,
                user_id = %user_id,
                superseded = %previous_owner,
                "Announcement superseded an existing presence entry"
            );
        }
        info!(
            conn_id = %conn_id,
            user_id = %user_id,
            username = %username,
            "User connected and joined room {}",
            user_id
        );

        Ok(AnnounceOutcome {
            superseded,
            left_room,
        })
    }

    /// Unbinds `conn_id`. Returns `None` when the connection never announced
    /// or was already withdrawn, in which case nothing is broadcast.
    pub async fn withdraw(&self, conn_id: ConnectionId) -> Option<WithdrawOutcome> {
        let mut state = self.state.lock().await;
        let membership = state.rooms.leave(conn_id)?;
        state.release(membership.room, conn_id);
        let still_online = state.entries.contains_key(&membership.room);

        self.broadcast_locked(&state);
        drop(state);

        info!(
            conn_id = %conn_id,
            user_id = %membership.room,
            username = %membership.username,
            still_online,
            "User disconnected"
        );

        Some(WithdrawOutcome {
            user_id: membership.room,
            still_online,
        })
    }

    /// Current mapping of user id to display name.
    pub async fn snapshot(&self) -> PresenceSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Whether a user currently has a presence entry.
    pub async fn is_online(&self, user_id: UserId) -> bool {
        self.state.lock().await.entries.contains_key(&user_id)
    }

    /// Connections currently in the room addressed by `user_id`.
    pub async fn members(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.state.lock().await.rooms.members(user_id)
    }

    /// The identity a connection announced, if any.
    pub async fn binding(&self, conn_id: ConnectionId) -> Option<(UserId, String)> {
        self.state
            .lock()
            .await
            .rooms
            .membership(conn_id)
            .map(|m| (m.room, m.username.clone()))
    }

    /// The full presence entry for a user.
    pub async fn entry(&self, user_id: UserId) -> Option<PresenceEntry> {
        self.state.lock().await.entries.get(&user_id).cloned()
    }

    /// Number of online users.
    pub async fn online_count(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    fn broadcast_locked(&self, state: &PresenceState) {
        let message = OutboundMessage::UpdateOnlineUsers(state.snapshot());
        let sent = self.pool.broadcast(&message);
        self.metrics.events_relayed(sent as u64);
    }
}

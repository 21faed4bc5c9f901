//! Presence entry definitions.

use serde::{Deserialize, Serialize};

use callhub_core::types::{ConnectionId, UserId};

/// One online user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    /// User id (unique key).
    pub user_id: UserId,
    /// Display name from the owning announcement.
    pub username: String,
    /// Connection whose announcement currently owns this entry.
    pub owner: ConnectionId,
}

/// Result of a successful announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceOutcome {
    /// Connection that owned the entry before and was superseded, if any.
    pub superseded: Option<ConnectionId>,
    /// Room the connection left because it re-announced as another user.
    pub left_room: Option<UserId>,
}

/// Result of withdrawing an announced connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawOutcome {
    /// Id the connection was bound to.
    pub user_id: UserId,
    /// Whether other connections keep the user online.
    pub still_online: bool,
}

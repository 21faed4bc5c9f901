//! Single room with member tracking.

use std::collections::HashSet;

use callhub_core::types::{ConnectionId, UserId};

/// All connections currently claiming one user id.
#[derive(Debug, Clone)]
pub struct Room {
    /// User id addressed by this room.
    pub key: UserId,
    /// Member connection ids.
    pub members: HashSet<ConnectionId>,
}

impl Room {
    /// Creates a new empty room.
    pub fn new(key: UserId) -> Self {
        Self {
            key,
            members: HashSet::new(),
        }
    }

    /// Adds a member. Returns `false` if it was already present.
    pub fn join(&mut self, conn_id: ConnectionId) -> bool {
        self.members.insert(conn_id)
    }

    /// Removes a member. Returns `false` if it was not present.
    pub fn leave(&mut self, conn_id: ConnectionId) -> bool {
        self.members.remove(&conn_id)
    }

    /// Returns member count.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Returns whether the room has any members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns all member connection ids.
    pub fn get_members(&self) -> Vec<ConnectionId> {
        self.members.iter().copied().collect()
    }
}

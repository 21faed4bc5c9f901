//! Room table: rooms by user id plus the reverse index from connection to
//! its single room.
//!
//! The table is plain data with no interior locking. It lives inside the
//! presence registry's state so that membership and presence entries change
//! under the same lock.

use std::collections::HashMap;

use callhub_core::types::{ConnectionId, UserId};

use super::room::Room;

/// What a connection announced when it joined its room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    /// Room (user id) the connection belongs to.
    pub room: UserId,
    /// Display name the connection announced.
    pub username: String,
    /// Announcement order; higher is newer.
    pub seq: u64,
}

/// All rooms and memberships.
#[derive(Debug, Default)]
pub struct RoomTable {
    /// User id → room.
    rooms: HashMap<UserId, Room>,
    /// Connection id → its membership (reverse index).
    memberships: HashMap<ConnectionId, Membership>,
}

impl RoomTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `conn_id` into room `room`, leaving any room it was in before.
    ///
    /// Returns the previous membership when the connection had one.
    pub fn join(
        &mut self,
        conn_id: ConnectionId,
        room: UserId,
        username: String,
        seq: u64,
    ) -> Option<Membership> {
        let previous = self.leave(conn_id);

        self.rooms
            .entry(room)
            .or_insert_with(|| Room::new(room))
            .join(conn_id);
        self.memberships.insert(
            conn_id,
            Membership {
                room,
                username,
                seq,
            },
        );

        previous
    }

    /// Drops `conn_id` from its room. Empty rooms are removed.
    pub fn leave(&mut self, conn_id: ConnectionId) -> Option<Membership> {
        let membership = self.memberships.remove(&conn_id)?;
        if let Some(room) = self.rooms.get_mut(&membership.room) {
            room.leave(conn_id);
            if room.is_empty() {
                self.rooms.remove(&membership.room);
            }
        }
        Some(membership)
    }

    /// Returns the membership of a connection.
    pub fn membership(&self, conn_id: ConnectionId) -> Option<&Membership> {
        self.memberships.get(&conn_id)
    }

    /// Returns member connection ids of a room (empty if the room is absent).
    pub fn members(&self, room: UserId) -> Vec<ConnectionId> {
        self.rooms
            .get(&room)
            .map(|r| r.get_members())
            .unwrap_or_default()
    }

    /// Whether the room currently has any member.
    pub fn has_members(&self, room: UserId) -> bool {
        self.rooms.get(&room).is_some_and(|r| !r.is_empty())
    }

    /// The most recently announced member of a room.
    pub fn latest_member(&self, room: UserId) -> Option<(ConnectionId, &Membership)> {
        let members = &self.rooms.get(&room)?.members;
        members
            .iter()
            .filter_map(|id| self.memberships.get(id).map(|m| (*id, m)))
            .max_by_key(|(_, m)| m.seq)
    }

    /// Number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of connections that belong to a room.
    pub fn member_count(&self) -> usize {
        self.memberships.len()
    }
}

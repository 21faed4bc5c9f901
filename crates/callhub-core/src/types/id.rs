//! Newtype wrappers for the identifiers that flow through signaling.
//!
//! User ids come from the external authentication service as plain
//! integers; connection ids are minted locally per WebSocket session.
//! Keeping them distinct prevents routing a frame to a connection id where a
//! user room was meant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an authenticated user, as issued by the auth service.
///
/// Only positive values address a real user; [`UserId::is_valid`] is checked
/// before an id is allowed into the presence registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Wrap a raw integer id.
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Return the inner integer value.
    pub fn get(self) -> i64 {
        self.0
    }

    /// Whether this id can address a user (strictly positive).
    pub fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

impl From<i64> for UserId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Unique identifier for one live WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return the inner UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_validity() {
        assert!(UserId::new(1).is_valid());
        assert!(!UserId::new(0).is_valid());
        assert!(!UserId::new(-4).is_valid());
    }

    #[test]
    fn test_user_id_from_str() {
        let id: UserId = " 42 ".parse().expect("should parse");
        assert_eq!(id, UserId(42));
        assert!("alice".parse::<UserId>().is_err());
    }

    #[test]
    fn test_user_id_is_transparent_in_json() {
        let json = serde_json::to_string(&UserId(7)).expect("serialize");
        assert_eq!(json, "7");
    }

    #[test]
    fn test_connection_id_new() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}

//! Connection pool of every live WebSocket connection by id.

use std::sync::Arc;

use dashmap::DashMap;

use callhub_core::types::ConnectionId;

use crate::message::types::OutboundMessage;

use super::handle::ConnectionHandle;

/// Thread-safe pool of all active WebSocket connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    /// Connection ID → connection handle.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
        }
    }

    /// Adds a connection to the pool.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.by_id.insert(handle.id, handle);
    }

    /// Removes a connection from the pool.
    ///
    /// Returns the handle only on the first removal, which lets callers run
    /// teardown exactly once.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.remove(conn_id).map(|(_, handle)| handle)
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Returns total number of active connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Sends a message to the given connections. Returns how many queued it.
    pub fn send_to(&self, conn_ids: &[ConnectionId], message: &OutboundMessage) -> usize {
        conn_ids
            .iter()
            .filter_map(|id| self.get(id))
            .filter(|handle| handle.send(message.clone()))
            .count()
    }

    /// Sends a message to every connection in the pool.
    pub fn broadcast(&self, message: &OutboundMessage) -> usize {
        self.all_connections()
            .iter()
            .filter(|handle| handle.send(message.clone()))
            .count()
    }
}

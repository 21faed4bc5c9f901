//! # callhub-realtime
//!
//! Real-time WebSocket signaling engine for CallHub. Provides:
//!
//! - WebSocket connection management with optional token authentication
//! - User presence tracking with full-snapshot broadcast
//! - Per-user rooms for directed relay
//! - Call signaling relay (initiate, accept, reject) with optional
//!   session tracking and ring timeouts

pub mod connection;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod room;
pub mod server;
pub mod signaling;

pub use connection::manager::ConnectionManager;
pub use presence::registry::PresenceRegistry;
pub use server::RealtimeEngine;
pub use signaling::router::CallRouter;

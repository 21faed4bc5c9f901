//! WebSocket connection management.

pub mod authenticator;
pub mod handle;
pub mod heartbeat;
pub mod manager;
pub mod pool;

pub use authenticator::WsAuthenticator;
pub use handle::ConnectionHandle;
pub use manager::{ConnectionManager, TeardownGuard};
pub use pool::ConnectionPool;

//! Call signaling: the initiate → accept/reject relay and the optional
//! per-call session table.

pub mod router;
pub mod session;

pub use router::{CallRouter, DropReason, RelayOutcome};
pub use session::{CallSession, CallSessionTracker, CallState};

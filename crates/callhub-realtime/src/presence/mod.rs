//! User presence tracking.

pub mod entry;
pub mod registry;

pub use entry::{AnnounceOutcome, PresenceEntry, WithdrawOutcome};
pub use registry::PresenceRegistry;

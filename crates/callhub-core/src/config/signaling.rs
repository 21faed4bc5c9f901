//! Call routing policy.
//!
//! Everything here defaults to off: the stock relay forwards events without
//! checking who sent them and never tells a caller that a call went nowhere.

use serde::{Deserialize, Serialize};

/// Longest ring timeout accepted, one day.
pub const MAX_RING_TIMEOUT_SECONDS: u64 = 86_400;

/// Call signaling router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalingConfig {
    /// Drop events unless the sending connection announced the sender-side
    /// identity.
    #[serde(default)]
    pub validate_participants: bool,
    /// Keep a per-(caller, callee) record and refuse accept/reject for calls
    /// that were never rung.
    #[serde(default)]
    pub track_sessions: bool,
    /// Seconds a ringing call may stay unanswered before it is reclaimed.
    #[serde(default = "default_ring_timeout")]
    pub ring_timeout_seconds: u64,
    /// How often the ringing-call sweeper runs, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Send `callFailed` back when a call cannot be delivered or times out.
    #[serde(default)]
    pub failure_acks: bool,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            validate_participants: false,
            track_sessions: false,
            ring_timeout_seconds: default_ring_timeout(),
            sweep_interval_seconds: default_sweep_interval(),
            failure_acks: false,
        }
    }
}

fn default_ring_timeout() -> u64 {
    45
}

fn default_sweep_interval() -> u64 {
    5
}

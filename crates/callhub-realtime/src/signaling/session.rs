//! Per-(caller, callee) call records, used when session tracking is on.
//!
//! A pair with no record is `Idle`. Initiate puts it in `Ringing`, accept
//! moves `Ringing` to `Connected`, reject drops a `Ringing` record, and the
//! sweeper drops `Ringing` records that were never answered.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use callhub_core::types::UserId;

/// Call state of one (caller, callee) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// No call in progress.
    Idle,
    /// Incoming call delivered, waiting for an answer.
    Ringing,
    /// Callee accepted.
    Connected,
}

/// One tracked call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSession {
    /// Who called.
    pub caller: UserId,
    /// Who was called.
    pub callee: UserId,
    /// Current state (never `Idle` for a stored record).
    pub state: CallState,
    /// When the record entered its current state.
    pub since: DateTime<Utc>,
}

/// Table of in-flight calls keyed by (caller, callee).
#[derive(Debug, Default)]
pub struct CallSessionTracker {
    sessions: DashMap<(UserId, UserId), CallSession>,
}

impl CallSessionTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `caller` is ringing `callee`. A repeated initiate
    /// restarts the ring (and replaces a connected call).
    pub fn ring(&self, caller: UserId, callee: UserId) {
        self.ring_at(caller, callee, Utc::now());
    }

    /// [`ring`](Self::ring) with an explicit clock.
    pub fn ring_at(&self, caller: UserId, callee: UserId, now: DateTime<Utc>) {
        self.sessions.insert(
            (caller, callee),
            CallSession {
                caller,
                callee,
                state: CallState::Ringing,
                since: now,
            },
        );
    }

    /// Move a ringing call to connected. Returns `false` if the pair was
    /// not ringing.
    pub fn connect(&self, caller: UserId, callee: UserId) -> bool {
        match self.sessions.get_mut(&(caller, callee)) {
            Some(mut session) if session.state == CallState::Ringing => {
                session.state = CallState::Connected;
                session.since = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// Drop a ringing call. Returns `false` if the pair was not ringing.
    pub fn reject(&self, caller: UserId, callee: UserId) -> bool {
        self.sessions
            .remove_if(&(caller, callee), |_, session| {
                session.state == CallState::Ringing
            })
            .is_some()
    }

    /// Current state of a pair.
    pub fn state(&self, caller: UserId, callee: UserId) -> CallState {
        self.sessions
            .get(&(caller, callee))
            .map(|s| s.state)
            .unwrap_or(CallState::Idle)
    }

    /// Forget every call the user takes part in. Returns how many went.
    pub fn clear_user(&self, user: UserId) -> usize {
        let mut removed = 0;
        self.sessions.retain(|(caller, callee), _| {
            let keep = *caller != user && *callee != user;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Remove ringing calls older than `timeout` as of `now` and return them.
    pub fn reclaim_expired(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<CallSession> {
        let cutoff = now - timeout;
        let expired: Vec<(UserId, UserId)> = self
            .sessions
            .iter()
            .filter(|r| r.state == CallState::Ringing && r.since <= cutoff)
            .map(|r| *r.key())
            .collect();

        expired
            .into_iter()
            .filter_map(|key| {
                self.sessions
                    .remove_if(&key, |_, s| s.state == CallState::Ringing && s.since <= cutoff)
                    .map(|(_, session)| session)
            })
            .collect()
    }

    /// Number of tracked calls.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no call is tracked.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);
    const CAROL: UserId = UserId(3);

    #[test]
    fn test_ring_accept_flow() {
        let tracker = CallSessionTracker::new();
        assert_eq!(tracker.state(ALICE, BOB), CallState::Idle);
        tracker.ring(ALICE, BOB);
        assert_eq!(tracker.state(ALICE, BOB), CallState::Ringing);
        assert!(tracker.connect(ALICE, BOB));
        assert_eq!(tracker.state(ALICE, BOB), CallState::Connected);
        assert!(!tracker.connect(ALICE, BOB));
    }

    #[test]
    fn test_accept_or_reject_without_ring_fails() {
        let tracker = CallSessionTracker::new();
        assert!(!tracker.connect(ALICE, BOB));
        assert!(!tracker.reject(ALICE, BOB));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_reject_only_drops_ringing() {
        let tracker = CallSessionTracker::new();
        tracker.ring(ALICE, BOB);
        tracker.connect(ALICE, BOB);
        assert!(!tracker.reject(ALICE, BOB));
        assert_eq!(tracker.state(ALICE, BOB), CallState::Connected);

        tracker.ring(CAROL, BOB);
        assert!(tracker.reject(CAROL, BOB));
        assert_eq!(tracker.state(CAROL, BOB), CallState::Idle);
    }

    #[test]
    fn test_reclaim_expired_only_takes_old_ringing_calls() {
        let tracker = CallSessionTracker::new();
        let now = Utc::now();
        tracker.ring_at(ALICE, BOB, now - Duration::seconds(60));
        tracker.ring_at(CAROL, BOB, now - Duration::seconds(5));
        tracker.ring_at(BOB, CAROL, now - Duration::seconds(90));
        tracker.connect(BOB, CAROL);

        let reclaimed = tracker.reclaim_expired(now, Duration::seconds(30));
        assert_eq!(reclaimed.len(), 1);
        assert_eq!(reclaimed[0].caller, ALICE);
        assert_eq!(tracker.state(ALICE, BOB), CallState::Idle);
        assert_eq!(tracker.state(CAROL, BOB), CallState::Ringing);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_clear_user_drops_both_directions() {
        let tracker = CallSessionTracker::new();
        tracker.ring(ALICE, BOB);
        tracker.ring(BOB, CAROL);
        tracker.ring(CAROL, ALICE);
        assert_eq!(tracker.clear_user(BOB), 2);
        assert_eq!(tracker.state(CAROL, ALICE), CallState::Ringing);
    }

    #[test]
    fn test_clear_user_while_other_calls_ring() {
        let tracker = Arc::new(CallSessionTracker::new());
        tracker.ring(ALICE, BOB);

        std::thread::scope(|scope| {
            let ringer = tracker.clone();
            scope.spawn(move || {
                for i in 10..20_010 {
                    ringer.ring(UserId(i), UserId(i + 1));
                }
            });
            for _ in 0..200 {
                assert_eq!(tracker.clear_user(UserId(-5)), 0);
            }
        });

        assert_eq!(tracker.clear_user(ALICE), 1);
        assert_eq!(tracker.len(), 20_000);
    }
}

//! Time-windowed brute-force lockout policy.

use chrono::{DateTime, TimeDelta, Utc};

/// Consecutive failures that put an account into lockout.
pub const MAX_ATTEMPTS: u32 = 5;

/// How long an account stays locked after reaching [`MAX_ATTEMPTS`].
pub const LOCKOUT_WINDOW: TimeDelta = TimeDelta::minutes(30);

/// Attempt state read once at the start of an evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttemptSnapshot {
    pub attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_attempts: u32,
    lockout_window: TimeDelta,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            lockout_window: LOCKOUT_WINDOW,
        }
    }
}

impl LockoutPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, lockout_window: TimeDelta) -> Self {
        Self {
            max_attempts,
            lockout_window,
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub const fn lockout_window(&self) -> TimeDelta {
        self.lockout_window
    }

    /// True while the snapshot has hit the limit and its last attempt is still
    /// inside the window. A timestamp in the future counts as inside.
    #[must_use]
    pub fn in_lockout(&self, snapshot: &AttemptSnapshot, now: DateTime<Utc>) -> bool {
        if snapshot.attempts < self.max_attempts {
            return false;
        }

        snapshot
            .last_attempt_at
            .is_some_and(|last| now.signed_duration_since(last) < self.lockout_window)
    }

    /// True when an attempt was recorded and the window since then has fully
    /// elapsed. Never true for a snapshot without a timestamp.
    #[must_use]
    pub fn window_expired(&self, snapshot: &AttemptSnapshot, now: DateTime<Utc>) -> bool {
        snapshot
            .last_attempt_at
            .is_some_and(|last| now.signed_duration_since(last) >= self.lockout_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(attempts: u32, minutes_ago: Option<i64>, now: DateTime<Utc>) -> AttemptSnapshot {
        AttemptSnapshot {
            attempts,
            last_attempt_at: minutes_ago.map(|m| now - TimeDelta::minutes(m)),
        }
    }

    #[test]
    fn default_policy_uses_fixed_constants() {
        let policy = LockoutPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.lockout_window(), TimeDelta::minutes(30));
    }

    #[test]
    fn below_limit_is_never_locked() {
        let now = Utc::now();
        let policy = LockoutPolicy::default();
        assert!(!policy.in_lockout(&snapshot(4, Some(0), now), now));
        assert!(!policy.in_lockout(&snapshot(0, None, now), now));
    }

    #[test]
    fn at_limit_inside_window_is_locked() {
        let now = Utc::now();
        let policy = LockoutPolicy::default();
        assert!(policy.in_lockout(&snapshot(5, Some(10), now), now));
        assert!(policy.in_lockout(&snapshot(9, Some(29), now), now));
    }

    #[test]
    fn lockout_ends_exactly_at_window_boundary() {
        let now = Utc::now();
        let policy = LockoutPolicy::default();
        assert!(!policy.in_lockout(&snapshot(5, Some(30), now), now));
        assert!(policy.window_expired(&snapshot(5, Some(30), now), now));
    }

    #[test]
    fn limit_without_timestamp_is_not_locked() {
        let now = Utc::now();
        let policy = LockoutPolicy::default();
        assert!(!policy.in_lockout(&snapshot(5, None, now), now));
        assert!(!policy.window_expired(&snapshot(5, None, now), now));
    }

    #[test]
    fn future_timestamp_counts_as_inside_window() {
        let now = Utc::now();
        let policy = LockoutPolicy::default();
        let ahead = AttemptSnapshot {
            attempts: 5,
            last_attempt_at: Some(now + TimeDelta::minutes(5)),
        };
        assert!(policy.in_lockout(&ahead, now));
        assert!(!policy.window_expired(&ahead, now));
    }
}

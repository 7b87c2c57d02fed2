//! Login decisions and the messages shown for them.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::policy::LockoutPolicy;

/// Who a rejection is about. Unknown identifiers never surface in messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Subject {
    Account(String),
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub identifier: String,
    pub display_name: String,
    pub account_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Authenticated { identity: Identity, token: String },
    /// Correct credential after the window expired; the counter was reset
    /// but no session was issued.
    ResetNotice { subject: Subject },
    LockedOut { subject: Subject },
    LimitReached { subject: Subject, attempt_count: u32 },
    AttemptFailed { subject: Subject, attempt_count: u32 },
}

/// Attempt-state change computed by one evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptMutation {
    Unchanged,
    /// Written to the account store.
    Recorded {
        attempt_count: u32,
        last_attempt_at: DateTime<Utc>,
    },
    /// Computed for an unknown identifier; there is no account to write to.
    Discarded {
        attempt_count: u32,
        last_attempt_at: DateTime<Utc>,
    },
}

impl AttemptMutation {
    #[must_use]
    pub const fn attempt_count(&self) -> Option<u32> {
        match self {
            Self::Unchanged => None,
            Self::Recorded { attempt_count, .. } | Self::Discarded { attempt_count, .. } => {
                Some(*attempt_count)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub outcome: Outcome,
    pub mutation: AttemptMutation,
}

impl Outcome {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// Short machine-readable tag, used in logs and response bodies.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => "authenticated",
            Self::ResetNotice { .. } => "reset_notice",
            Self::LockedOut { .. } => "locked_out",
            Self::LimitReached { .. } => "limit_reached",
            Self::AttemptFailed { .. } => "attempt_failed",
        }
    }

    /// Human-readable message for a rejection, stamped with `at`.
    ///
    /// Returns `None` for [`Outcome::Authenticated`], which is rendered as a
    /// session payload instead.
    #[must_use]
    pub fn message(&self, at: DateTime<Utc>, policy: &LockoutPolicy) -> Option<String> {
        let stamp = at.format("%Y-%m-%d %H:%M:%S");

        let text = match self {
            Self::Authenticated { .. } => return None,
            Self::ResetNotice {
                subject: Subject::Account(identifier),
            } => format!(
                "User {identifier} may try to log in again: more than {} minutes have passed since the limit was applied. Attempts reset to 0",
                policy.lockout_window().num_minutes()
            ),
            Self::LockedOut {
                subject: Subject::Account(identifier),
            } => format!(
                "User {identifier} tried to log in but was rejected with 403 for exceeding the attempt limit."
            ),
            Self::LimitReached {
                subject: Subject::Account(identifier),
                attempt_count,
            } => format!("User {identifier} failed to log in. Attempt = {attempt_count}. Limit reached"),
            Self::AttemptFailed {
                subject: Subject::Account(identifier),
                attempt_count,
            } => format!("User {identifier} failed to log in. Attempt = {attempt_count}"),
            Self::ResetNotice { .. }
            | Self::LockedOut { .. }
            | Self::LimitReached { .. }
            | Self::AttemptFailed { .. } => "Invalid email or password".to_string(),
        };

        Some(format!("[{stamp}] {text}"))
    }
}

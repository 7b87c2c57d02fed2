//! Login throttle and credential verifier.
//!
//! Flow for one attempt:
//! 1) Serialize on the identifier and read the account once (the snapshot).
//! 2) Decide lockout from the snapshot, before anything is mutated.
//! 3) Compare the credential exactly once, against the account hash or the
//!    placeholder, on every path.
//! 4) Classify, compute the attempt mutation and persist it when there is an
//!    account to persist against.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    credential::{CompareError, CredentialComparer, ResolvedHash},
    locks::KeyedLocks,
    outcome::{AttemptMutation, Evaluation, Identity, Outcome, Subject},
    policy::{AttemptSnapshot, LockoutPolicy},
    store::{AccountRecord, AccountStore, StoreError},
    token::{TokenError, TokenIssuer},
};

#[derive(Debug, thiserror::Error)]
pub enum EvaluateError {
    #[error("account lookup failed: {0}")]
    StoreRead(#[source] StoreError),
    /// The decision was made but its attempt state could not be written.
    /// The decision travels with the error so callers can still act on it.
    #[error("attempt state not persisted ({}): {source}", .evaluation.outcome.kind())]
    Unpersisted {
        evaluation: Box<Evaluation>,
        #[source]
        source: StoreError,
    },
    #[error("credential comparison failed: {0}")]
    Comparer(#[from] CompareError),
    #[error(transparent)]
    TokenIssue(#[from] TokenError),
}

pub struct LoginVerifier {
    store: Arc<dyn AccountStore>,
    comparer: Arc<dyn CredentialComparer>,
    issuer: Arc<dyn TokenIssuer>,
    policy: LockoutPolicy,
    locks: KeyedLocks,
}

impl std::fmt::Debug for LoginVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginVerifier")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl LoginVerifier {
    #[must_use]
    pub fn new(
        store: Arc<dyn AccountStore>,
        comparer: Arc<dyn CredentialComparer>,
        issuer: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            store,
            comparer,
            issuer,
            policy: LockoutPolicy::default(),
            locks: KeyedLocks::new(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: LockoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Decide the fate of one login attempt.
    ///
    /// # Errors
    /// - [`EvaluateError::StoreRead`] if the lookup fails (after the comparison ran).
    /// - [`EvaluateError::Comparer`] if the comparer cannot produce a verdict.
    /// - [`EvaluateError::TokenIssue`] if an authenticated attempt cannot get a token.
    /// - [`EvaluateError::Unpersisted`] if the attempt state could not be written.
    #[instrument(skip(self, candidate), fields(outcome = tracing::field::Empty))]
    pub async fn evaluate(
        &self,
        identifier: &str,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, EvaluateError> {
        let _guard = self.locks.lock(identifier).await;

        let lookup = self.store.find_by_identifier(identifier).await;
        let account = lookup.as_ref().ok().and_then(Option::as_ref);

        let snapshot = account.map_or_else(AttemptSnapshot::default, AccountRecord::snapshot);
        let in_lockout = account.is_some() && self.policy.in_lockout(&snapshot, now);

        let resolved = account.map_or(ResolvedHash::Placeholder, |account| {
            ResolvedHash::Account(&account.credential_hash)
        });
        let matched = self
            .comparer
            .compare(candidate, resolved.as_str(&*self.comparer))
            .await;

        let account = match lookup {
            Ok(account) => account,
            Err(err) => return Err(EvaluateError::StoreRead(err)),
        };
        let matched = matched?;

        let evaluation = match account {
            Some(account) if matched => self.classify_match(&account, snapshot, in_lockout, now)?,
            account => self.classify_miss(account.as_ref(), snapshot, in_lockout, now),
        };

        tracing::Span::current().record("outcome", evaluation.outcome.kind());

        self.persist(identifier, evaluation).await
    }

    /// Case A: the account exists and the credential matched.
    fn classify_match(
        &self,
        account: &AccountRecord,
        snapshot: AttemptSnapshot,
        in_lockout: bool,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, EvaluateError> {
        let subject = Subject::Account(account.identifier.clone());

        // Window expiry is checked before issuing a token: the attempt that
        // lands after the window only resets the counter.
        if self.policy.window_expired(&snapshot, now) {
            return Ok(Evaluation {
                outcome: Outcome::ResetNotice { subject },
                mutation: AttemptMutation::Recorded {
                    attempt_count: 0,
                    last_attempt_at: now,
                },
            });
        }

        if in_lockout {
            return Ok(Evaluation {
                outcome: Outcome::LockedOut { subject },
                mutation: AttemptMutation::Unchanged,
            });
        }

        let token = self.issuer.issue(&account.identifier, account.id)?;

        Ok(Evaluation {
            outcome: Outcome::Authenticated {
                identity: Identity {
                    identifier: account.identifier.clone(),
                    display_name: account.display_name.clone(),
                    account_id: account.id,
                },
                token,
            },
            mutation: AttemptMutation::Unchanged,
        })
    }

    /// Case B: unknown identifier, or the credential did not match.
    fn classify_miss(
        &self,
        account: Option<&AccountRecord>,
        snapshot: AttemptSnapshot,
        in_lockout: bool,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let snapshot_attempts = snapshot.attempts;
        let mutated_attempts = snapshot_attempts.saturating_add(1);

        let (subject, mutation) = match account {
            Some(account) => (
                Subject::Account(account.identifier.clone()),
                AttemptMutation::Recorded {
                    attempt_count: mutated_attempts,
                    last_attempt_at: now,
                },
            ),
            None => (
                Subject::Unknown,
                AttemptMutation::Discarded {
                    attempt_count: mutated_attempts,
                    last_attempt_at: now,
                },
            ),
        };

        let outcome = if mutated_attempts == self.policy.max_attempts() {
            Outcome::LimitReached {
                subject,
                attempt_count: mutated_attempts,
            }
        } else if in_lockout {
            Outcome::LockedOut { subject }
        } else {
            Outcome::AttemptFailed {
                subject,
                attempt_count: mutated_attempts,
            }
        };

        Evaluation { outcome, mutation }
    }

    async fn persist(
        &self,
        identifier: &str,
        evaluation: Evaluation,
    ) -> Result<Evaluation, EvaluateError> {
        match evaluation.mutation {
            AttemptMutation::Recorded {
                attempt_count,
                last_attempt_at,
            } => {
                if let Err(source) = self
                    .store
                    .persist_attempt(identifier, attempt_count, last_attempt_at)
                    .await
                {
                    warn!(
                        outcome = evaluation.outcome.kind(),
                        attempt_count, "Attempt state not persisted: {source}"
                    );
                    return Err(EvaluateError::Unpersisted {
                        evaluation: Box::new(evaluation),
                        source,
                    });
                }
                info!(
                    outcome = evaluation.outcome.kind(),
                    attempt_count, "Attempt state recorded"
                );
            }
            AttemptMutation::Discarded { .. } => {
                debug!("Unknown identifier, attempt state discarded");
            }
            AttemptMutation::Unchanged => {
                debug!(outcome = evaluation.outcome.kind(), "Attempt state unchanged");
            }
        }

        Ok(evaluation)
    }
}

//! Account storage used by the login verifier.
//!
//! The verifier needs two things from storage: resolve an identifier to its
//! account record, and write back attempt state. Account registration and
//! password changes (`auth::accounts`) go through the same store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::policy::AttemptSnapshot;

mod memory;
mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

/// A not-yet-stored account. New accounts start with no recorded attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAccount {
    pub identifier: String,
    pub display_name: String,
    pub credential_hash: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: Uuid,
    pub identifier: String,
    pub display_name: String,
    /// PHC-formatted hash of the current credential. Never modified here.
    pub credential_hash: String,
    pub attempt_count: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl AccountRecord {
    #[must_use]
    pub fn snapshot(&self) -> AttemptSnapshot {
        AttemptSnapshot {
            attempts: self.attempt_count,
            last_attempt_at: self.last_attempt_at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("account store query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("account {identifier} holds an invalid attempt count: {value}")]
    InvalidAttemptCount { identifier: String, value: i64 },
    #[error("account {0} is already registered")]
    DuplicateIdentifier(String),
    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// `Ok(None)` is the not-found case; errors are reserved for store failures.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<AccountRecord>, StoreError>;

    async fn persist_attempt(
        &self,
        identifier: &str,
        attempt_count: u32,
        last_attempt_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Fails with [`StoreError::DuplicateIdentifier`] if the identifier is taken.
    async fn create_account(&self, account: NewAccount) -> Result<AccountRecord, StoreError>;

    /// Replace the stored credential hash. Returns `false` if no account matched.
    async fn update_credential(
        &self,
        identifier: &str,
        credential_hash: &str,
    ) -> Result<bool, StoreError>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

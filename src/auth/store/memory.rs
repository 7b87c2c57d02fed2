use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountRecord, AccountStore, NewAccount, StoreError};

/// Process-local account store, keyed by identifier.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, AccountRecord>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account.
    pub async fn insert(&self, record: AccountRecord) {
        self.accounts
            .write()
            .await
            .insert(record.identifier.clone(), record);
    }

    pub async fn get(&self, identifier: &str) -> Option<AccountRecord> {
        self.accounts.read().await.get(identifier).cloned()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<AccountRecord>, StoreError> {
        Ok(self.get(identifier).await)
    }

    async fn persist_attempt(
        &self,
        identifier: &str,
        attempt_count: u32,
        last_attempt_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        let record = accounts
            .get_mut(identifier)
            .ok_or_else(|| StoreError::Unavailable(format!("no account for {identifier}")))?;
        record.attempt_count = attempt_count;
        record.last_attempt_at = Some(last_attempt_at);
        Ok(())
    }

    async fn create_account(&self, account: NewAccount) -> Result<AccountRecord, StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.identifier) {
            return Err(StoreError::DuplicateIdentifier(account.identifier));
        }

        let record = AccountRecord {
            id: Uuid::new_v4(),
            identifier: account.identifier,
            display_name: account.display_name,
            credential_hash: account.credential_hash,
            attempt_count: 0,
            last_attempt_at: None,
        };
        accounts.insert(record.identifier.clone(), record.clone());

        Ok(record)
    }

    async fn update_credential(
        &self,
        identifier: &str,
        credential_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.get_mut(identifier).is_some_and(|record| {
            record.credential_hash = credential_hash.to_string();
            true
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

//! Account registration and password changes.
//!
//! Both operations hash with the same Argon2 parameters the comparer verifies
//! against. Registration never touches attempt state; a new account starts at
//! zero attempts with no recorded attempt time.

use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    credential::{HashError, hash_password},
    store::{AccountRecord, AccountStore, NewAccount, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("account {0} is already registered")]
    AlreadyRegistered(String),
    #[error("no account for {0}")]
    NotFound(String),
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error("credential hashing did not complete: {0}")]
    Aborted(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateIdentifier(identifier) => Self::AlreadyRegistered(identifier),
            err => Self::Store(err),
        }
    }
}

pub struct Registrar {
    store: Arc<dyn AccountStore>,
}

impl Registrar {
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Create an account for an identifier that is not yet registered.
    ///
    /// # Errors
    /// [`AccountError::AlreadyRegistered`] if the identifier is taken, or a
    /// hashing or store failure.
    #[instrument(skip(self, display_name, password))]
    pub async fn register(
        &self,
        identifier: &str,
        display_name: &str,
        password: &str,
    ) -> Result<AccountRecord, AccountError> {
        if self.store.find_by_identifier(identifier).await?.is_some() {
            return Err(AccountError::AlreadyRegistered(identifier.to_string()));
        }

        let credential_hash = hash_off_thread(password).await?;

        // The store's unique constraint still decides a race between two
        // registrations of the same identifier.
        let record = self
            .store
            .create_account(NewAccount {
                identifier: identifier.to_string(),
                display_name: display_name.to_string(),
                credential_hash,
            })
            .await?;

        info!(user_id = %record.id, "Account registered");

        Ok(record)
    }

    /// Replace the credential of an existing account. Attempt state is kept.
    ///
    /// # Errors
    /// [`AccountError::NotFound`] if no account matches, or a hashing or store
    /// failure.
    #[instrument(skip(self, password))]
    pub async fn change_password(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<(), AccountError> {
        let credential_hash = hash_off_thread(password).await?;

        if !self
            .store
            .update_credential(identifier, &credential_hash)
            .await?
        {
            return Err(AccountError::NotFound(identifier.to_string()));
        }

        info!("Password changed");

        Ok(())
    }
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar").finish_non_exhaustive()
    }
}

async fn hash_off_thread(password: &str) -> Result<String, AccountError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AccountError::Aborted(e.to_string()))?
        .map_err(AccountError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Argon2Comparer, CredentialComparer, MemoryAccountStore};

    fn registrar() -> (Arc<MemoryAccountStore>, Registrar) {
        let store = Arc::new(MemoryAccountStore::new());
        (store.clone(), Registrar::new(store))
    }

    #[tokio::test]
    async fn register_stores_a_verifiable_hash() {
        let (store, registrar) = registrar();

        let record = registrar
            .register("alice@example.com", "Alice", "correct horse")
            .await
            .expect("register");

        assert_eq!(record.attempt_count, 0);
        assert!(record.last_attempt_at.is_none());
        assert_ne!(record.credential_hash, "correct horse");

        let stored = store.get("alice@example.com").await.expect("stored");
        let comparer = Argon2Comparer::new().expect("comparer");
        assert!(
            comparer
                .compare("correct horse", &stored.credential_hash)
                .await
                .expect("compare")
        );
    }

    #[tokio::test]
    async fn register_refuses_duplicate_email() {
        let (_store, registrar) = registrar();
        registrar
            .register("alice@example.com", "Alice", "correct horse")
            .await
            .expect("register");

        let again = registrar
            .register("alice@example.com", "Other Alice", "battery staple")
            .await;

        assert!(matches!(again, Err(AccountError::AlreadyRegistered(id)) if id == "alice@example.com"));
    }

    #[tokio::test]
    async fn change_password_replaces_hash_and_keeps_attempts() {
        let (store, registrar) = registrar();
        registrar
            .register("alice@example.com", "Alice", "correct horse")
            .await
            .expect("register");
        store
            .persist_attempt("alice@example.com", 2, chrono::Utc::now())
            .await
            .expect("persist");

        registrar
            .change_password("alice@example.com", "battery staple")
            .await
            .expect("change");

        let stored = store.get("alice@example.com").await.expect("stored");
        assert_eq!(stored.attempt_count, 2);
        let comparer = Argon2Comparer::new().expect("comparer");
        assert!(
            comparer
                .compare("battery staple", &stored.credential_hash)
                .await
                .expect("compare")
        );
        assert!(
            !comparer
                .compare("correct horse", &stored.credential_hash)
                .await
                .expect("compare")
        );
    }

    #[tokio::test]
    async fn change_password_for_unknown_account_fails() {
        let (_store, registrar) = registrar();

        let result = registrar.change_password("nobody@example.com", "whatever").await;

        assert!(matches!(result, Err(AccountError::NotFound(_))));
    }
}

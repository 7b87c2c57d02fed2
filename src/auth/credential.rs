//! Credential comparison.
//!
//! Every evaluation runs exactly one comparison. When the identifier does not
//! resolve to an account the comparison still happens, against a placeholder
//! hash produced with the same Argon2 parameters as real credentials, so the
//! comparison cost does not depend on whether the account exists.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use rand::{Rng, distributions::Alphanumeric};

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("stored credential hash is malformed: {0}")]
    MalformedHash(String),
    #[error("credential comparison did not complete: {0}")]
    Aborted(String),
}

#[derive(Debug, thiserror::Error)]
#[error("failed to hash credential: {0}")]
pub struct HashError(String);

/// The hash a comparison runs against, chosen before the comparison executes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedHash<'a> {
    Account(&'a str),
    Placeholder,
}

impl<'a> ResolvedHash<'a> {
    /// The hash string to hand to the comparer.
    #[must_use]
    pub fn as_str<C: CredentialComparer + ?Sized>(&self, comparer: &'a C) -> &'a str {
        match *self {
            Self::Account(hash) => hash,
            Self::Placeholder => comparer.placeholder(),
        }
    }
}

#[async_trait]
pub trait CredentialComparer: Send + Sync {
    /// Compare a candidate credential against a stored hash. The cost must not
    /// depend on whether `hash` is a real account hash or [`Self::placeholder`].
    async fn compare(&self, candidate: &str, hash: &str) -> Result<bool, CompareError>;

    /// Fixed, non-account hash compared against when no account is found.
    fn placeholder(&self) -> &str;
}

#[derive(Clone, Debug)]
pub struct Argon2Comparer {
    placeholder: String,
}

impl Argon2Comparer {
    /// Builds the comparer and derives its placeholder hash from a random
    /// value nobody knows.
    ///
    /// # Errors
    /// Returns an error if hashing the placeholder fails.
    pub fn new() -> Result<Self, HashError> {
        let filler: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        Ok(Self {
            placeholder: hash_password(&filler)?,
        })
    }
}

#[async_trait]
impl CredentialComparer for Argon2Comparer {
    async fn compare(&self, candidate: &str, hash: &str) -> Result<bool, CompareError> {
        let candidate = candidate.to_owned();
        let hash = hash.to_owned();

        // Argon2 is CPU bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || verify_password(&candidate, &hash))
            .await
            .map_err(|e| CompareError::Aborted(e.to_string()))?
    }

    fn placeholder(&self) -> &str {
        &self.placeholder
    }
}

/// Hash a credential into a PHC string with the default Argon2 parameters.
///
/// # Errors
/// Returns an error if Argon2 rejects the input.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashError(e.to_string()))
}

fn verify_password(candidate: &str, hash: &str) -> Result<bool, CompareError> {
    let parsed = PasswordHash::new(hash).map_err(|e| CompareError::MalformedHash(e.to_string()))?;

    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CompareError::Aborted(e.to_string())),
    }
}

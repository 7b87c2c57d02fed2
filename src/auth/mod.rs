//! Login throttling and credential verification.
//!
//! ## Lockout Policy
//!
//! - **Attempt Limit:** 5 consecutive failed attempts lock the account.
//! - **Lockout Window:** the lock lasts 30 minutes from the last recorded attempt.
//! - **Correct credentials do not bypass lockout.** The first correct login after
//!   the window has expired resets the counter and asks the user to log in again.
//!
//! ## Account Probing
//!
//! The credential comparison runs exactly once per attempt, against a
//! placeholder hash when the identifier is unknown. Rejections for unknown
//! identifiers carry only generic text.

pub mod accounts;
pub mod credential;
pub mod locks;
pub mod outcome;
pub mod policy;
pub mod store;
pub mod token;
pub mod verifier;

pub use accounts::{AccountError, Registrar};
pub use credential::{
    Argon2Comparer, CompareError, CredentialComparer, HashError, ResolvedHash, hash_password,
};
pub use outcome::{AttemptMutation, Evaluation, Identity, Outcome, Subject};
pub use policy::{AttemptSnapshot, LOCKOUT_WINDOW, LockoutPolicy, MAX_ATTEMPTS};
pub use store::{
    AccountRecord, AccountStore, MemoryAccountStore, NewAccount, PgAccountStore, StoreError,
};
pub use token::{JwtIssuer, TokenError, TokenIssuer};
pub use verifier::{EvaluateError, LoginVerifier};

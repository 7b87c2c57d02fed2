//! # Custodia (Login Throttling & Credential Verification)
//!
//! `custodia` guards a password login endpoint against brute force. Every
//! login attempt goes through [`auth::LoginVerifier`], which combines a
//! time-windowed lockout with a credential check that takes the same path
//! whether or not the account exists.
//!
//! ## Lockout
//!
//! Five consecutive failures lock an account for 30 minutes. Correct
//! credentials do not bypass the lock. Attempt state lives in the account
//! store (`users.attempts`, `users.last_attempt`).
//!
//! ## Account Probing
//!
//! Unknown identifiers are compared against a placeholder hash, so the
//! credential comparison costs the same whether or not the account exists,
//! and their rejection carries generic text only. Known accounts still get
//! per-account messages and lockout statuses, and only they cause an attempt
//! write.

pub mod auth;
pub mod cli;
pub mod custodia;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

use crate::{
    auth::{Argon2Comparer, JwtIssuer, LoginVerifier, PgAccountStore},
    custodia,
};
use anyhow::{Context, Result};
use chrono::TimeDelta;
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub token_secret: SecretString,
    pub token_ttl_seconds: u32,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the DSN is invalid, the database is unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let dsn = Url::parse(&args.dsn).context("Invalid database connection string")?;

    info!(
        "Connecting to database {}:{}{}",
        dsn.host_str().unwrap_or("localhost"),
        dsn.port().unwrap_or(5432),
        dsn.path()
    );

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn.as_str())
        .await
        .context("Failed to connect to database")?;

    let comparer = Argon2Comparer::new().context("Failed to prepare credential comparer")?;
    let issuer = JwtIssuer::new(
        args.token_secret,
        TimeDelta::seconds(i64::from(args.token_ttl_seconds)),
    );

    let verifier = LoginVerifier::new(
        Arc::new(PgAccountStore::new(pool)),
        Arc::new(comparer),
        Arc::new(issuer),
    );

    debug!("Login verifier: {:?}", verifier);

    custodia::new(args.port, Arc::new(verifier)).await
}

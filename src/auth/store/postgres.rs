//! `PostgreSQL` account store backed by the `users` table (`sql/schema.sql`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Connection, PgPool, Row, postgres::PgRow};
use tracing::{Instrument, info_span};

use super::{AccountRecord, AccountStore, NewAccount, StoreError};

const FIND_ACCOUNT: &str =
    "SELECT id, email, name, password, attempts, last_attempt FROM users WHERE email = $1";
const INSERT_ACCOUNT: &str = "INSERT INTO users (email, name, password) VALUES ($1, $2, $3) \
     RETURNING id, email, name, password, attempts, last_attempt";

#[derive(Clone, Debug)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<AccountRecord>, StoreError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = FIND_ACCOUNT
        );
        let row = sqlx::query(FIND_ACCOUNT)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        row.map(|row| account_from_row(&row)).transpose()
    }

    async fn persist_attempt(
        &self,
        identifier: &str,
        attempt_count: u32,
        last_attempt_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let attempts =
            i32::try_from(attempt_count).map_err(|_| StoreError::InvalidAttemptCount {
                identifier: identifier.to_string(),
                value: i64::from(attempt_count),
            })?;

        let query = "UPDATE users SET attempts = $2, last_attempt = $3 WHERE email = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(identifier)
            .bind(attempts)
            .bind(last_attempt_at)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Unavailable(format!(
                "attempt update for {identifier} matched no rows"
            )));
        }

        Ok(())
    }

    async fn create_account(&self, account: NewAccount) -> Result<AccountRecord, StoreError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = INSERT_ACCOUNT
        );
        let row = sqlx::query(INSERT_ACCOUNT)
            .bind(&account.identifier)
            .bind(&account.display_name)
            .bind(&account.credential_hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    StoreError::DuplicateIdentifier(account.identifier.clone())
                }
                err => StoreError::Query(err),
            })?;

        account_from_row(&row)
    }

    async fn update_credential(
        &self,
        identifier: &str,
        credential_hash: &str,
    ) -> Result<bool, StoreError> {
        let query = "UPDATE users SET password = $2 WHERE email = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(identifier)
            .bind(credential_hash)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;

        Ok(())
    }
}

fn account_from_row(row: &PgRow) -> Result<AccountRecord, StoreError> {
    let identifier: String = row.try_get("email")?;

    let attempts: i32 = row.try_get("attempts")?;
    let attempt_count = u32::try_from(attempts).map_err(|_| StoreError::InvalidAttemptCount {
        identifier: identifier.clone(),
        value: i64::from(attempts),
    })?;

    Ok(AccountRecord {
        id: row.try_get("id")?,
        identifier,
        display_name: row.try_get("name")?,
        credential_hash: row.try_get("password")?,
        attempt_count,
        last_attempt_at: row.try_get("last_attempt")?,
    })
}

//! Session token issuance for successful logins.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("failed to issue session token: {0}")]
pub struct TokenError(String);

pub trait TokenIssuer: Send + Sync {
    /// Turn an authenticated account into an opaque session credential.
    ///
    /// # Errors
    /// Returns an error if the token cannot be produced.
    fn issue(&self, identifier: &str, account_id: Uuid) -> Result<String, TokenError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 JWT issuer.
#[derive(Debug)]
pub struct JwtIssuer {
    secret: SecretString,
    ttl: TimeDelta,
}

impl JwtIssuer {
    #[must_use]
    pub fn new(secret: SecretString, ttl: TimeDelta) -> Self {
        Self { secret, ttl }
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, identifier: &str, account_id: Uuid) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account_id.to_string(),
            email: identifier.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| TokenError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    #[test]
    fn issued_token_carries_account_claims() {
        let issuer = JwtIssuer::new(SecretString::from("test-secret"), TimeDelta::hours(1));
        let account_id = Uuid::new_v4();

        let token = issuer
            .issue("alice@example.com", account_id)
            .expect("token");

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .expect("decode");

        assert_eq!(data.claims.sub, account_id.to_string());
        assert_eq!(data.claims.email, "alice@example.com");
        assert_eq!(data.claims.exp - data.claims.iat, 3600);
    }

    #[test]
    fn token_does_not_verify_with_another_secret() {
        let issuer = JwtIssuer::new(SecretString::from("one"), TimeDelta::hours(1));
        let token = issuer
            .issue("alice@example.com", Uuid::new_v4())
            .expect("token");

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"two"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }
}

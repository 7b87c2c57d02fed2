use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use chrono::{DateTime, TimeDelta, Utc};
use custodia::auth::{
    AccountRecord, AccountStore, Argon2Comparer, JwtIssuer, LoginVerifier, MemoryAccountStore,
    NewAccount, StoreError, hash_password,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const EMAIL: &str = "budi@example.com";
const PASSWORD: &str = "hunter2-but-longer";

struct TestApp {
    router: Router,
    store: Arc<MemoryAccountStore>,
    account_id: Uuid,
}

/// Wraps the memory store and fails reads or writes on demand.
struct FaultyStore {
    inner: Arc<MemoryAccountStore>,
    fail_reads: bool,
    fail_writes: bool,
}

#[async_trait]
impl AccountStore for FaultyStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<AccountRecord>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Unavailable("reads down".to_string()));
        }
        self.inner.find_by_identifier(identifier).await
    }

    async fn persist_attempt(
        &self,
        identifier: &str,
        attempt_count: u32,
        last_attempt_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("writes down".to_string()));
        }
        self.inner
            .persist_attempt(identifier, attempt_count, last_attempt_at)
            .await
    }

    async fn create_account(&self, account: NewAccount) -> Result<AccountRecord, StoreError> {
        self.inner.create_account(account).await
    }

    async fn update_credential(
        &self,
        identifier: &str,
        credential_hash: &str,
    ) -> Result<bool, StoreError> {
        self.inner.update_credential(identifier, credential_hash).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

async fn seeded_store(
    attempts: u32,
    last_attempt_minutes_ago: Option<i64>,
    credential_hash: String,
) -> (Arc<MemoryAccountStore>, Uuid) {
    let store = Arc::new(MemoryAccountStore::new());
    let account_id = Uuid::new_v4();
    store
        .insert(AccountRecord {
            id: account_id,
            identifier: EMAIL.to_string(),
            display_name: "Budi".to_string(),
            credential_hash,
            attempt_count: attempts,
            last_attempt_at: last_attempt_minutes_ago
                .map(|minutes| Utc::now() - TimeDelta::minutes(minutes)),
        })
        .await;
    (store, account_id)
}

fn router_over(store: Arc<dyn AccountStore>) -> Result<Router> {
    let verifier = LoginVerifier::new(
        store,
        Arc::new(Argon2Comparer::new()?),
        Arc::new(JwtIssuer::new(
            SecretString::from("integration-secret"),
            TimeDelta::hours(1),
        )),
    );

    Ok(custodia::custodia::router(Arc::new(verifier)))
}

async fn app(attempts: u32, last_attempt_minutes_ago: Option<i64>) -> Result<TestApp> {
    let (store, account_id) =
        seeded_store(attempts, last_attempt_minutes_ago, hash_password(PASSWORD)?).await;

    Ok(TestApp {
        router: router_over(store.clone())?,
        store,
        account_id,
    })
}

async fn faulty_app(fail_reads: bool, fail_writes: bool) -> Result<Router> {
    let (inner, _) = seeded_store(0, None, hash_password(PASSWORD)?).await;
    router_over(Arc::new(FaultyStore {
        inner,
        fail_reads,
        fail_writes,
    }))
}

async fn post_login(router: &Router, email: &str, password: &str) -> Result<(StatusCode, Value)> {
    post_json(
        router,
        "/user/login",
        &json!({ "email": email, "password": password }),
    )
    .await
}

async fn post_json(router: &Router, uri: &str, payload: &Value) -> Result<(StatusCode, Value)> {
    let request = Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))?;

    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    Ok((status, body))
}

#[tokio::test]
async fn correct_credentials_return_session() -> Result<()> {
    let app = app(0, None).await?;

    let (status, body) = post_login(&app.router, EMAIL, PASSWORD).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], EMAIL);
    assert_eq!(body["name"], "Budi");
    assert_eq!(body["user_id"], app.account_id.to_string());
    assert!(body["token"].as_str().is_some_and(|token| !token.is_empty()));
    Ok(())
}

#[tokio::test]
async fn email_is_normalized_before_lookup() -> Result<()> {
    let app = app(0, None).await?;

    let (status, _) = post_login(&app.router, "  BUDI@Example.com ", PASSWORD).await?;

    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_counted() -> Result<()> {
    let app = app(0, None).await?;

    let (status, body) = post_login(&app.router, EMAIL, "wrong").await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["outcome"], "attempt_failed");
    assert!(
        body["message"]
            .as_str()
            .is_some_and(|message| message.ends_with("failed to log in. Attempt = 1"))
    );

    let stored = app.store.get(EMAIL).await.context("account")?;
    assert_eq!(stored.attempt_count, 1);
    Ok(())
}

#[tokio::test]
async fn fifth_failure_reaches_limit_and_locks() -> Result<()> {
    let app = app(0, None).await?;

    for _ in 0..4 {
        let (status, _) = post_login(&app.router, EMAIL, "wrong").await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = post_login(&app.router, EMAIL, "wrong").await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["outcome"], "limit_reached");

    let (status, body) = post_login(&app.router, EMAIL, PASSWORD).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["outcome"], "locked_out");
    Ok(())
}

#[tokio::test]
async fn expired_lockout_resets_before_login() -> Result<()> {
    let app = app(5, Some(31)).await?;

    let (status, body) = post_login(&app.router, EMAIL, PASSWORD).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["outcome"], "reset_notice");

    let (status, _) = post_login(&app.router, EMAIL, PASSWORD).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn unknown_email_gets_generic_rejection() -> Result<()> {
    let app = app(0, None).await?;

    let (status, body) = post_login(&app.router, "ghost@example.com", PASSWORD).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let message = body["message"].as_str().context("message")?;
    assert!(message.ends_with("Invalid email or password"));
    assert!(!message.contains("ghost"));
    Ok(())
}

#[tokio::test]
async fn invalid_email_is_rejected() -> Result<()> {
    let app = app(0, None).await?;

    let (status, _) = post_login(&app.router, "not-an-email", PASSWORD).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn health_reports_store_status() -> Result<()> {
    let app = app(0, None).await?;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    assert!(response.headers().contains_key("x-request-id"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["store"], "ok");
    assert_eq!(body["name"], "custodia");
    Ok(())
}

#[tokio::test]
async fn unpersisted_attempt_fails_closed() -> Result<()> {
    let router = faulty_app(false, true).await?;

    let (status, _) = post_login(&router, EMAIL, "wrong").await?;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn lookup_failure_is_server_error() -> Result<()> {
    let router = faulty_app(true, false).await?;

    let (status, _) = post_login(&router, EMAIL, PASSWORD).await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

#[tokio::test]
async fn malformed_stored_hash_is_server_error() -> Result<()> {
    let (store, _) = seeded_store(0, None, "not-a-phc-string".to_string()).await;
    let router = router_over(store.clone())?;

    let (status, _) = post_login(&router, EMAIL, PASSWORD).await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let stored = store.get(EMAIL).await.context("account")?;
    assert_eq!(stored.attempt_count, 0);
    Ok(())
}

#[tokio::test]
async fn registered_account_can_log_in() -> Result<()> {
    let app = app(0, None).await?;

    let (status, body) = post_json(
        &app.router,
        "/user/register",
        &json!({ "name": "Sari", "email": " Sari@Example.com", "password": "kopi-tubruk" }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "sari@example.com");
    assert_eq!(body["name"], "Sari");

    let stored = app.store.get("sari@example.com").await.context("account")?;
    assert_eq!(stored.attempt_count, 0);
    assert!(stored.last_attempt_at.is_none());

    let (status, _) = post_login(&app.router, "sari@example.com", "kopi-tubruk").await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_conflicts() -> Result<()> {
    let app = app(0, None).await?;

    let (status, _) = post_json(
        &app.router,
        "/user/register",
        &json!({ "name": "Budi Lagi", "email": EMAIL, "password": "another-one" }),
    )
    .await?;

    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn registration_validates_input() -> Result<()> {
    let app = app(0, None).await?;

    let short = json!({ "name": "Sari", "email": "sari@example.com", "password": "12345" });
    let (status, _) = post_json(&app.router, "/user/register", &short).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let nameless = json!({ "name": "  ", "email": "sari@example.com", "password": "123456" });
    let (status, _) = post_json(&app.router, "/user/register", &nameless).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.store.get("sari@example.com").await.is_none());
    Ok(())
}

#[tokio::test]
async fn password_change_requires_current_password() -> Result<()> {
    let app = app(0, None).await?;

    let (status, body) = post_json(
        &app.router,
        "/user/password",
        &json!({ "email": EMAIL, "password": "wrong", "new_password": "new-secret" }),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["outcome"], "attempt_failed");

    let (status, _) = post_login(&app.router, EMAIL, "new-secret").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn password_change_replaces_credential() -> Result<()> {
    let app = app(0, None).await?;

    let (status, _) = post_json(
        &app.router,
        "/user/password",
        &json!({ "email": EMAIL, "password": PASSWORD, "new_password": "new-secret" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post_login(&app.router, EMAIL, PASSWORD).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_login(&app.router, EMAIL, "new-secret").await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn password_change_is_refused_while_locked() -> Result<()> {
    let app = app(5, Some(1)).await?;

    let (status, body) = post_json(
        &app.router,
        "/user/password",
        &json!({ "email": EMAIL, "password": PASSWORD, "new_password": "new-secret" }),
    )
    .await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["outcome"], "locked_out");
    Ok(())
}

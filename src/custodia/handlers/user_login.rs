use super::{normalize_email, valid_email};
use crate::auth::{EvaluateError, Evaluation, LoginVerifier, Outcome};
use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct UserLogin {
    email: String,
    password: String,
}

impl fmt::Debug for UserLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserLogin")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    email: String,
    name: String,
    user_id: Uuid,
    token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRejection {
    outcome: String,
    message: String,
}

#[utoipa::path(
    post,
    path= "/user/login",
    request_body = UserLogin,
    responses (
        (status = 200, description = "Login successful", body = LoginResponse, content_type = "application/json"),
        (status = 400, description = "Missing payload or invalid email"),
        (status = 401, description = "Invalid credentials, or attempt counter reset after lockout", body = LoginRejection),
        (status = 403, description = "Attempt limit reached or account locked", body = LoginRejection),
        (status = 503, description = "Attempt could not be recorded"),
    ),
    tag= "login"
)]
#[instrument(skip(verifier, payload))]
pub async fn login(
    verifier: Extension<Arc<LoginVerifier>>,
    payload: Option<Json<UserLogin>>,
) -> Response {
    let user: UserLogin = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    debug!("user: {:?}", user);

    let email = normalize_email(&user.email);
    if !valid_email(&email) {
        error!("Invalid email");

        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    let now = Utc::now();

    match verifier.evaluate(&email, &user.password, now).await {
        Ok(evaluation) => render(&verifier, evaluation, now),

        Err(EvaluateError::Unpersisted { evaluation, source }) => {
            // Fail closed: an attempt we could not record must not look like
            // an ordinary rejection the client can keep retrying.
            error!(
                outcome = evaluation.outcome.kind(),
                "Login decision not persisted: {source}"
            );

            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Login temporarily unavailable".to_string(),
            )
                .into_response()
        }

        Err(err) => {
            error!("Login evaluation failed: {err}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error evaluating login".to_string(),
            )
                .into_response()
        }
    }
}

pub(super) fn render(
    verifier: &LoginVerifier,
    evaluation: Evaluation,
    now: chrono::DateTime<Utc>,
) -> Response {
    let kind = evaluation.outcome.kind();
    let message = evaluation
        .outcome
        .message(now, verifier.policy())
        .unwrap_or_default();

    let status = match evaluation.outcome {
        Outcome::Authenticated { identity, token } => {
            info!(user_id = %identity.account_id, "Login successful");

            return (
                StatusCode::OK,
                Json(LoginResponse {
                    email: identity.identifier,
                    name: identity.display_name,
                    user_id: identity.account_id,
                    token,
                }),
            )
                .into_response();
        }
        Outcome::ResetNotice { .. } | Outcome::AttemptFailed { .. } => StatusCode::UNAUTHORIZED,
        Outcome::LimitReached { .. } | Outcome::LockedOut { .. } => StatusCode::FORBIDDEN,
    };

    warn!(outcome = kind, "{message}");

    (
        status,
        Json(LoginRejection {
            outcome: kind.to_string(),
            message,
        }),
    )
        .into_response()
}

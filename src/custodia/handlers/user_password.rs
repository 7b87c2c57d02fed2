use super::{
    normalize_email,
    user_login::{LoginRejection, render},
    valid_email, valid_password,
};
use crate::auth::{EvaluateError, LoginVerifier, Outcome, Registrar};
use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct PasswordChange {
    email: String,
    password: String,
    new_password: String,
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordChange")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("new_password", &"[REDACTED]")
            .finish()
    }
}

/// The current password is checked through the login verifier, so a password
/// change counts as a login attempt and is refused while the account is
/// locked.
#[utoipa::path(
    post,
    path= "/user/password",
    request_body = PasswordChange,
    responses (
        (status = 200, description = "Password changed"),
        (status = 400, description = "Missing payload, invalid email or new password out of bounds"),
        (status = 401, description = "Current password rejected", body = LoginRejection),
        (status = 403, description = "Attempt limit reached or account locked", body = LoginRejection),
        (status = 503, description = "Attempt could not be recorded"),
    ),
    tag= "login"
)]
#[instrument(skip(verifier, registrar, payload))]
pub async fn change_password(
    verifier: Extension<Arc<LoginVerifier>>,
    registrar: Extension<Arc<Registrar>>,
    payload: Option<Json<PasswordChange>>,
) -> Response {
    let change: PasswordChange = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    debug!("change: {:?}", change);

    let email = normalize_email(&change.email);
    if !valid_email(&email) {
        error!("Invalid email");

        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    if !valid_password(&change.new_password) {
        return (
            StatusCode::BAD_REQUEST,
            "Password must be 6 to 32 characters".to_string(),
        )
            .into_response();
    }

    let now = Utc::now();

    let evaluation = match verifier.evaluate(&email, &change.password, now).await {
        Ok(evaluation) => evaluation,
        Err(EvaluateError::Unpersisted { evaluation, source }) => {
            error!(
                outcome = evaluation.outcome.kind(),
                "Password change attempt not persisted: {source}"
            );

            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "Password change temporarily unavailable".to_string(),
            )
                .into_response();
        }
        Err(err) => {
            error!("Password change evaluation failed: {err}");

            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error changing password".to_string(),
            )
                .into_response();
        }
    };

    if !matches!(evaluation.outcome, Outcome::Authenticated { .. }) {
        return render(&verifier, evaluation, now);
    }

    match registrar.change_password(&email, &change.new_password).await {
        Ok(()) => (StatusCode::OK, "Password changed".to_string()).into_response(),
        Err(err) => {
            error!("Error changing password: {err}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error changing password".to_string(),
            )
                .into_response()
        }
    }
}

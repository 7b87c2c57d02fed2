use super::{normalize_email, valid_email, valid_password};
use crate::auth::{AccountError, Registrar};
use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct UserRegister {
    name: String,
    email: String,
    password: String,
}

impl fmt::Debug for UserRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRegister")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisteredUser {
    user_id: Uuid,
    email: String,
    name: String,
}

#[utoipa::path(
    post,
    path= "/user/register",
    request_body = UserRegister,
    responses (
        (status = 201, description = "Account created", body = RegisteredUser, content_type = "application/json"),
        (status = 400, description = "Missing payload, invalid email, empty name or password out of bounds"),
        (status = 409, description = "Email already registered"),
    ),
    tag= "register"
)]
#[instrument(skip(registrar, payload))]
pub async fn register(
    registrar: Extension<Arc<Registrar>>,
    payload: Option<Json<UserRegister>>,
) -> Response {
    let user: UserRegister = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    debug!("user: {:?}", user);

    let email = normalize_email(&user.email);
    if !valid_email(&email) {
        error!("Invalid email");

        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    let name = user.name.trim();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "Name is required".to_string()).into_response();
    }

    if !valid_password(&user.password) {
        return (
            StatusCode::BAD_REQUEST,
            "Password must be 6 to 32 characters".to_string(),
        )
            .into_response();
    }

    match registrar.register(&email, name, &user.password).await {
        Ok(record) => (
            StatusCode::CREATED,
            Json(RegisteredUser {
                user_id: record.id,
                email: record.identifier,
                name: record.display_name,
            }),
        )
            .into_response(),

        Err(AccountError::AlreadyRegistered(_)) => {
            (StatusCode::CONFLICT, "Email is already registered".to_string()).into_response()
        }

        Err(err) => {
            error!("Error registering account: {err}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error registering account".to_string(),
            )
                .into_response()
        }
    }
}

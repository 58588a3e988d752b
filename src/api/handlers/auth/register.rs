//! Registration endpoint. Never issues a token.

use super::{
    error::AuthError,
    state::AuthState,
    storage::{self, InsertOutcome},
    types::{MessageResponse, RegisterRequest},
    utils::{hash_password, valid_username},
};
use axum::{extract::Extension, http::StatusCode, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, instrument};

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = MessageResponse),
        (status = 400, description = "Invalid username, weak password, or username taken"),
    ),
    tag = "auth"
)]
#[instrument(skip(pool, state, payload))]
pub async fn register(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<MessageResponse>), AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::BadRequest("Missing payload".to_string()));
    };

    if request.username.is_empty() || request.password.is_empty() {
        return Err(AuthError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    if !valid_username(&request.username) {
        return Err(AuthError::BadRequest("Invalid username".to_string()));
    }

    state
        .config()
        .policy()
        .validate_strength(&request.password)
        .map_err(AuthError::WeakPassword)?;

    let password_hash = hash_password(&request.password)?;

    match storage::insert_user(&pool, &request.username, &password_hash, "user", true).await? {
        InsertOutcome::Created(user_id) => {
            info!("registered user {user_id}");
            Ok((
                StatusCode::CREATED,
                Json(MessageResponse {
                    message: "Registration successful, please log in".to_string(),
                }),
            ))
        }
        InsertOutcome::Conflict => {
            Err(AuthError::BadRequest("Username already exists".to_string()))
        }
    }
}

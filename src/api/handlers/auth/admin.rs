//! Administrator lock/unlock/reset actions.
//!
//! The administrator lock is independent of the attempt counters and wins
//! over them; unlocking also clears any temporary window so the account is
//! immediately usable again.

use super::{
    error::AuthError,
    principal::require_admin,
    state::AuthState,
    storage,
    types::{AdminUserRow, MessageResponse},
};
use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All accounts with lock state", body = [AdminUserRow]),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an administrator"),
    ),
    tag = "admin"
)]
pub async fn list_users(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<AdminUserRow>>, AuthError> {
    require_admin(&headers, &state)?;
    Ok(Json(storage::list_users(&pool).await?))
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}/lock",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account locked", body = MessageResponse),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "No such account"),
    ),
    tag = "admin"
)]
#[instrument(skip(pool, state, headers))]
pub async fn lock_user(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AuthError> {
    let admin = require_admin(&headers, &state)?;

    if !storage::set_locked(&pool, user_id, true).await? {
        return Err(AuthError::NotFound("User"));
    }

    info!("{} locked account {user_id}", admin.username);
    Ok(Json(MessageResponse {
        message: "Account locked".to_string(),
    }))
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}/unlock",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account unlocked", body = MessageResponse),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "No such account"),
    ),
    tag = "admin"
)]
#[instrument(skip(pool, state, headers))]
pub async fn unlock_user(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AuthError> {
    let admin = require_admin(&headers, &state)?;

    if !storage::set_locked(&pool, user_id, false).await? {
        return Err(AuthError::NotFound("User"));
    }

    info!("{} unlocked account {user_id}", admin.username);
    Ok(Json(MessageResponse {
        message: "Account unlocked".to_string(),
    }))
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}/reset-attempts",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Counters reset", body = MessageResponse),
        (status = 403, description = "Caller is not an administrator"),
    ),
    tag = "admin"
)]
#[instrument(skip(pool, state, headers))]
pub async fn reset_attempts(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AuthError> {
    let admin = require_admin(&headers, &state)?;

    storage::reset_login_state(&pool, user_id).await?;

    info!("{} reset counters for account {user_id}", admin.username);
    Ok(Json(MessageResponse {
        message: "Failed login counters reset".to_string(),
    }))
}

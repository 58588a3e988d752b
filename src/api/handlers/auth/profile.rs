//! Profile and notification-settings endpoints.

use super::{
    error::AuthError,
    principal::require_auth,
    state::AuthState,
    storage,
    types::{EmailSettingsRequest, MessageResponse, ProfileResponse, UpdateProfileRequest},
};
use axum::{extract::Extension, http::HeaderMap, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    get,
    path = "/auth/profile",
    responses(
        (status = 200, description = "Caller profile", body = ProfileResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User no longer exists"),
    ),
    tag = "auth"
)]
pub async fn profile(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, AuthError> {
    let principal = require_auth(&headers, &state)?;

    let record = storage::fetch_profile(&pool, principal.user_id)
        .await?
        .ok_or(AuthError::NotFound("User"))?;

    Ok(Json(ProfileResponse {
        id: record.id,
        username: record.username,
        full_name: record.full_name,
        email: record.email,
        phone: record.phone,
        password_changed_at: record.password_changed_at,
        receive_login_alerts: record.receive_login_alerts,
    }))
}

#[utoipa::path(
    put,
    path = "/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = MessageResponse),
        (status = 400, description = "Email already in use"),
        (status = 401, description = "Missing or invalid token"),
    ),
    tag = "auth"
)]
#[instrument(skip(pool, state, headers, payload))]
pub async fn update_profile(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
    payload: Option<Json<UpdateProfileRequest>>,
) -> Result<Json<MessageResponse>, AuthError> {
    let principal = require_auth(&headers, &state)?;

    let Some(Json(request)) = payload else {
        return Err(AuthError::BadRequest("Missing payload".to_string()));
    };

    if let Some(email) = request.email.as_deref() {
        if storage::email_taken_by_other(&pool, email, principal.user_id).await? {
            return Err(AuthError::BadRequest(
                "Email is already used by another account".to_string(),
            ));
        }
    }

    let updated = storage::update_profile(
        &pool,
        principal.user_id,
        request.full_name.as_deref(),
        request.email.as_deref(),
        request.phone.as_deref(),
    )
    .await?;

    if !updated {
        return Err(AuthError::NotFound("User"));
    }

    Ok(Json(MessageResponse {
        message: "Profile updated".to_string(),
    }))
}

#[utoipa::path(
    put,
    path = "/auth/email-settings",
    request_body = EmailSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = MessageResponse),
        (status = 401, description = "Missing or invalid token"),
    ),
    tag = "auth"
)]
pub async fn email_settings(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
    payload: Option<Json<EmailSettingsRequest>>,
) -> Result<Json<MessageResponse>, AuthError> {
    let principal = require_auth(&headers, &state)?;

    let Some(Json(request)) = payload else {
        return Err(AuthError::BadRequest("Missing payload".to_string()));
    };

    let updated =
        storage::update_email_settings(&pool, principal.user_id, request.receive_login_alerts)
            .await?;

    if !updated {
        return Err(AuthError::NotFound("User"));
    }

    Ok(Json(MessageResponse {
        message: "Email settings updated".to_string(),
    }))
}

//! Login endpoint: gates, credential verify, counter bookkeeping, token mint.

use super::{
    error::AuthError,
    lockout::{self, Gate},
    state::AuthState,
    storage,
    types::{LoginRequest, LoginResponse},
    utils::{extract_client_ip, extract_user_agent, verify_password},
};
use crate::api::notify::{AlertQueue, LoginAlert};
use axum::{extract::Extension, http::HeaderMap, Json};
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, instrument};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account locked (temporary or administrator)"),
    ),
    tag = "auth"
)]
#[instrument(skip(pool, state, alerts, headers, payload))]
pub async fn login(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    alerts: Extension<AlertQueue>,
    headers: HeaderMap,
    payload: Option<Json<LoginRequest>>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::BadRequest("Missing payload".to_string()));
    };

    if request.username.is_empty() || request.password.is_empty() {
        return Err(AuthError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    // A missing account and a wrong password produce the same response.
    let user = storage::fetch_user_by_username(&pool, &request.username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let now = Utc::now();

    match lockout::gate(user.is_locked, user.lockout_until, now) {
        Gate::PermanentlyLocked => return Err(AuthError::PermanentLock),
        Gate::TemporarilyLocked { remaining_seconds } => {
            return Err(AuthError::TemporaryLock { remaining_seconds })
        }
        Gate::Open => {}
    }

    if !verify_password(&request.password, &user.password_hash) {
        let counters =
            storage::record_login_failure(&pool, user.id, state.config().lockout(), now).await?;

        if let Some(until) = counters.locked_until {
            return Err(AuthError::TemporaryLock {
                remaining_seconds: lockout::remaining_seconds(until, now),
            });
        }

        return Err(AuthError::InvalidCredentials);
    }

    storage::reset_login_state(&pool, user.id).await?;

    let token = state
        .issuer()
        .issue(user.id, &user.username, &user.role, user.password_changed_at, now)
        .map_err(|err| AuthError::Store(err.into()))?;

    // Fire-and-forget: the alert never delays or fails the response.
    if let Some(email) = user.email.filter(|_| user.receive_login_alerts) {
        alerts.enqueue(LoginAlert {
            user_id: user.id,
            email,
            username: user.username.clone(),
            login_time: now,
            ip: extract_client_ip(&headers),
            browser: extract_user_agent(&headers),
        });
    } else {
        debug!("login alert skipped for {}", user.username);
    }

    Ok(Json(LoginResponse { token }))
}

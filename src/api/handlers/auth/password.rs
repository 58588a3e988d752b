//! Password change and policy introspection endpoints.

use super::{
    error::AuthError,
    history::PasswordHistory,
    principal::require_auth,
    state::AuthState,
    storage,
    types::{
        ChangePasswordRequest, ChangePasswordResponse, PasswordPolicyResponse, PolicyConstants,
    },
    utils::{hash_password, verify_password},
};
use axum::{extract::Extension, http::HeaderMap, Json};
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{instrument, warn};

#[utoipa::path(
    put,
    path = "/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ChangePasswordResponse),
        (status = 400, description = "Weak password, wrong current password, or recent reuse"),
        (status = 401, description = "Missing or invalid token"),
    ),
    tag = "auth"
)]
#[instrument(skip(pool, state, headers, payload))]
pub async fn change_password(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
    payload: Option<Json<ChangePasswordRequest>>,
) -> Result<Json<ChangePasswordResponse>, AuthError> {
    let principal = require_auth(&headers, &state)?;

    let Some(Json(request)) = payload else {
        return Err(AuthError::BadRequest("Missing payload".to_string()));
    };

    if request.old_password.is_empty() || request.new_password.is_empty() {
        return Err(AuthError::BadRequest(
            "Current and new password are required".to_string(),
        ));
    }

    let policy = *state.config().policy();
    policy
        .validate_strength(&request.new_password)
        .map_err(AuthError::WeakPassword)?;

    let user = storage::fetch_user_by_id(&pool, principal.user_id)
        .await?
        .ok_or(AuthError::NotFound("User"))?;

    if !verify_password(&request.old_password, &user.password_hash) {
        return Err(AuthError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    // Reuse check. A failed history read degrades open: the change proceeds
    // rather than being blocked by a secondary lookup.
    let in_history = match storage::fetch_password_history(&pool, principal.user_id).await {
        Ok(raw) => {
            let history = PasswordHistory::from_stored(raw.as_deref(), policy.history_window);
            history.contains(&request.new_password)
                || verify_password(&request.new_password, &user.password_hash)
        }
        Err(err) => {
            warn!("password history check failed, continuing: {err:?}");
            verify_password(&request.new_password, &user.password_hash)
        }
    };

    if in_history {
        return Err(AuthError::BadRequest(
            "New password must differ from recently used passwords".to_string(),
        ));
    }

    let new_hash = hash_password(&request.new_password)?;
    let now = Utc::now();
    storage::rotate_password(&pool, principal.user_id, &new_hash, policy.history_window, now)
        .await?;

    Ok(Json(ChangePasswordResponse {
        message: "Password changed successfully".to_string(),
        next_expiry: policy.next_expiry(now),
    }))
}

#[utoipa::path(
    get,
    path = "/auth/password-policy",
    responses(
        (status = 200, description = "Active password policy", body = PasswordPolicyResponse),
        (status = 401, description = "Missing or invalid token"),
    ),
    tag = "auth"
)]
pub async fn password_policy(
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Result<Json<PasswordPolicyResponse>, AuthError> {
    require_auth(&headers, &state)?;

    let policy = state.config().policy();
    Ok(Json(PasswordPolicyResponse {
        policy: PolicyConstants {
            min_length: policy.min_length,
            max_length: policy.max_length,
            require_uppercase: policy.require_uppercase,
            require_lowercase: policy.require_lowercase,
            require_numbers: policy.require_digit,
            require_special_chars: policy.require_special,
            max_age_days: policy.max_age_days,
            history_window: policy.history_window,
        },
        description: format!(
            "Passwords must be {}-{} characters with uppercase, lowercase, a number, and a \
             special character, and must be changed every {} days.",
            policy.min_length, policy.max_length, policy.max_age_days
        ),
    }))
}

//! Bearer-token authentication and the password-expiry gate.

use super::{error::AuthError, state::AuthState, storage};
use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// The authenticated caller, as asserted by a verified token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub role: String,
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the bearer token into a [`Principal`].
///
/// # Errors
///
/// Returns 401 when the token is missing, malformed, expired, or forged.
pub(crate) fn require_auth(headers: &HeaderMap, state: &AuthState) -> Result<Principal, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::Unauthorized("Missing token"))?;

    let claims = state
        .issuer()
        .verify(token)
        .map_err(|_| AuthError::Unauthorized("Invalid or expired token"))?;

    Ok(Principal {
        user_id: claims.sub,
        username: claims.username,
        role: claims.role,
    })
}

/// Like [`require_auth`], additionally demanding the admin role.
pub(crate) fn require_admin(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<Principal, AuthError> {
    let principal = require_auth(headers, state)?;
    if principal.role != "admin" {
        return Err(AuthError::Forbidden("Admin role required"));
    }
    Ok(principal)
}

/// Paths allowed through even with an expired password: the user must still
/// be able to change the password or end the session.
pub(crate) fn expiry_exempt(path: &str) -> bool {
    path.contains("change-password") || path.contains("logout")
}

/// Middleware over authenticated routes: an expired password short-circuits
/// with a machine-readable 403 before the handler runs.
///
/// Freshness comes from the live row, never the token snapshot. Requests
/// without a valid token pass through so the handler can return its own 401,
/// and a store failure here degrades open: the expiry gate is secondary to
/// the operation itself.
pub(crate) async fn enforce_password_expiry(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    if expiry_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let Ok(principal) = require_auth(request.headers(), &state) else {
        return next.run(request).await;
    };

    match storage::fetch_password_changed_at(&pool, principal.user_id).await {
        Ok(Some(changed_at)) if state.config().policy().is_expired(changed_at, Utc::now()) => {
            AuthError::PasswordExpired.into_response()
        }
        Ok(_) => next.run(request).await,
        Err(err) => {
            error!("password expiry check failed, continuing: {err:?}");
            next.run(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{state::AuthConfig, token::TokenIssuer};
    use super::*;
    use axum::http::HeaderValue;
    use secrecy::SecretString;

    fn state() -> AuthState {
        AuthState::new(
            AuthConfig::new(),
            TokenIssuer::new(&SecretString::from("test-secret"), 120),
        )
    }

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn bearer_token_parses_header() {
        assert_eq!(bearer_token(&headers_with("abc")), Some("abc"));
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn require_auth_round_trips_claims() {
        let state = state();
        let user_id = Uuid::new_v4();
        let token = state
            .issuer()
            .issue(user_id, "alice", "user", Utc::now(), Utc::now())
            .unwrap();

        let principal = require_auth(&headers_with(&token), &state).unwrap();
        assert_eq!(principal.user_id, user_id);
        assert_eq!(principal.username, "alice");
        assert_eq!(principal.role, "user");
    }

    #[test]
    fn require_auth_rejects_missing_and_garbage_tokens() {
        let state = state();
        assert!(matches!(
            require_auth(&HeaderMap::new(), &state),
            Err(AuthError::Unauthorized("Missing token"))
        ));
        assert!(matches!(
            require_auth(&headers_with("garbage"), &state),
            Err(AuthError::Unauthorized("Invalid or expired token"))
        ));
    }

    #[test]
    fn require_admin_checks_role() {
        let state = state();
        let token = state
            .issuer()
            .issue(Uuid::new_v4(), "alice", "user", Utc::now(), Utc::now())
            .unwrap();
        assert!(matches!(
            require_admin(&headers_with(&token), &state),
            Err(AuthError::Forbidden("Admin role required"))
        ));

        let token = state
            .issuer()
            .issue(Uuid::new_v4(), "root", "admin", Utc::now(), Utc::now())
            .unwrap();
        assert!(require_admin(&headers_with(&token), &state).is_ok());
    }

    #[test]
    fn expiry_exemption_covers_change_password_and_logout() {
        assert!(expiry_exempt("/auth/change-password"));
        assert!(expiry_exempt("/auth/logout"));
        assert!(!expiry_exempt("/auth/profile"));
        assert!(!expiry_exempt("/admin/users"));
    }
}

//! Error taxonomy for the auth surface.
//!
//! Every variant maps to one HTTP status and one client-facing body. Store
//! failures are logged with full detail server-side and surface only as a
//! generic 500; the credential failure message never reveals which of
//! username or password was wrong.

use super::policy::PolicyViolation;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    BadRequest(String),

    #[error("password does not meet the policy")]
    WeakPassword(Vec<PolicyViolation>),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("account temporarily locked for {remaining_seconds}s")]
    TemporaryLock { remaining_seconds: i64 },

    #[error("account locked by administrator")]
    PermanentLock,

    #[error("password expired")]
    PasswordExpired,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.into())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "message": message })),
            Self::WeakPassword(violations) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "message": "Password is not strong enough",
                    "errors": violations.iter().map(ToString::to_string).collect::<Vec<_>>(),
                }),
            ),
            Self::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, json!({ "message": message }))
            }
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Invalid username or password" }),
            ),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, json!({ "message": message })),
            Self::TemporaryLock { remaining_seconds } => (
                StatusCode::FORBIDDEN,
                json!({
                    "message": format!("Account temporarily locked, try again in {remaining_seconds}s"),
                    "code": "ACCOUNT_TEMP_LOCKED",
                    "retry_after_seconds": remaining_seconds,
                }),
            ),
            // No timing information on purpose.
            Self::PermanentLock => (
                StatusCode::FORBIDDEN,
                json!({
                    "message": "Account locked by administrator",
                    "code": "ACCOUNT_LOCKED",
                }),
            ),
            Self::PasswordExpired => (
                StatusCode::FORBIDDEN,
                json!({
                    "message": "Your password has expired. Change it to continue.",
                    "code": "PASSWORD_EXPIRED",
                    "redirect_to": "/profile",
                }),
            ),
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "message": format!("{what} not found") }),
            ),
            Self::Store(err) => {
                error!("store failure: {err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

//! Request/response types for auth endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_changed_at: DateTime<Utc>,
    pub receive_login_alerts: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EmailSettingsRequest {
    pub receive_login_alerts: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ChangePasswordResponse {
    pub message: String,
    pub next_expiry: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PasswordPolicyResponse {
    pub policy: PolicyConstants,
    pub description: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PolicyConstants {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special_chars: bool,
    pub max_age_days: i64,
    pub history_window: usize,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AdminUserRow {
    pub id: Uuid,
    pub username: String,
    pub role: String,
    pub is_locked: bool,
    pub failed_login_attempts: i32,
    pub lockout_until: Option<DateTime<Utc>>,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn login_request_round_trips() -> Result<()> {
        let request = LoginRequest {
            username: "alice".to_string(),
            password: "Correct-Horse7Battery".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let username = value
            .get("username")
            .and_then(serde_json::Value::as_str)
            .context("missing username")?;
        assert_eq!(username, "alice");
        let decoded: LoginRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.password, "Correct-Horse7Battery");
        Ok(())
    }

    #[test]
    fn update_profile_fields_are_optional() -> Result<()> {
        let decoded: UpdateProfileRequest = serde_json::from_str("{}")?;
        assert!(decoded.full_name.is_none());
        assert!(decoded.email.is_none());
        assert!(decoded.phone.is_none());
        Ok(())
    }

    #[test]
    fn change_password_response_serializes_expiry() -> Result<()> {
        let response = ChangePasswordResponse {
            message: "Password changed".to_string(),
            next_expiry: chrono::Utc::now(),
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("next_expiry").is_some());
        Ok(())
    }
}

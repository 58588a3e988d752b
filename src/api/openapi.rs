//! `OpenAPI` document for the HTTP surface.

use crate::api::handlers::{auth, health};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::register::register,
        auth::login::login,
        auth::password::change_password,
        auth::password::password_policy,
        auth::profile::profile,
        auth::profile::update_profile,
        auth::profile::email_settings,
        auth::admin::list_users,
        auth::admin::lock_user,
        auth::admin::unlock_user,
        auth::admin::reset_attempts,
    ),
    components(schemas(
        health::Health,
        auth::types::RegisterRequest,
        auth::types::LoginRequest,
        auth::types::LoginResponse,
        auth::types::MessageResponse,
        auth::types::ProfileResponse,
        auth::types::UpdateProfileRequest,
        auth::types::EmailSettingsRequest,
        auth::types::ChangePasswordRequest,
        auth::types::ChangePasswordResponse,
        auth::types::PasswordPolicyResponse,
        auth::types::PolicyConstants,
        auth::types::AdminUserRow,
    )),
    tags(
        (name = "auth", description = "Registration, login, and password lifecycle"),
        (name = "admin", description = "Administrator lock and counter actions"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_auth_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|path| path.as_str() == "/auth/login"));
        assert!(paths.iter().any(|path| path.as_str() == "/auth/register"));
        assert!(paths
            .iter()
            .any(|path| path.as_str() == "/auth/change-password"));
        assert!(paths
            .iter()
            .any(|path| path.as_str() == "/admin/users/{id}/lock"));
    }
}

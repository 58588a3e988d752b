use secrecy::SecretString;

/// Secrets shared across the server lifetime, kept out of `Debug` output.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub jwt_secret: SecretString,
    pub default_admin_password: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(jwt_secret: SecretString, default_admin_password: SecretString) -> Self {
        Self {
            jwt_secret,
            default_admin_password,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(
            SecretString::from("supersecretkey"),
            SecretString::from("Admin@Secure123!"),
        );
        assert_eq!(args.jwt_secret.expose_secret(), "supersecretkey");
        assert_eq!(
            args.default_admin_password.expose_secret(),
            "Admin@Secure123!"
        );
    }

    #[test]
    fn test_global_args_debug_redacts_secrets() {
        let args = GlobalArgs::new(
            SecretString::from("supersecretkey"),
            SecretString::from("Admin@Secure123!"),
        );
        let debug = format!("{args:?}");
        assert!(!debug.contains("supersecretkey"));
        assert!(!debug.contains("Admin@Secure123!"));
    }
}

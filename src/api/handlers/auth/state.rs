//! Auth configuration and shared state.

use super::{
    lockout::{EscalationMode, LockoutPolicy},
    policy::PasswordPolicy,
    token::TokenIssuer,
};

const DEFAULT_TOKEN_TTL_MINUTES: i64 = 120;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    token_ttl_minutes: i64,
    allowed_origins: Vec<String>,
    policy: PasswordPolicy,
    lockout: LockoutPolicy,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            allowed_origins: Vec::new(),
            policy: PasswordPolicy::default(),
            lockout: LockoutPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_token_ttl_minutes(mut self, minutes: i64) -> Self {
        self.token_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_allowed_origin(mut self, origin: String) -> Self {
        self.allowed_origins.push(origin);
        self
    }

    #[must_use]
    pub fn with_escalation_mode(mut self, mode: EscalationMode) -> Self {
        self.lockout.mode = mode;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn token_ttl_minutes(&self) -> i64 {
        self.token_ttl_minutes
    }

    #[must_use]
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    #[must_use]
    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    #[must_use]
    pub fn lockout(&self) -> &LockoutPolicy {
        &self.lockout
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AuthState {
    config: AuthConfig,
    issuer: TokenIssuer,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, issuer: TokenIssuer) -> Self {
        Self { config, issuer }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new();

        assert_eq!(config.token_ttl_minutes(), DEFAULT_TOKEN_TTL_MINUTES);
        assert!(config.allowed_origins().is_empty());
        assert_eq!(config.policy().min_length, 12);
        assert_eq!(config.lockout().mode, EscalationMode::Saturating);

        let config = config
            .with_token_ttl_minutes(30)
            .with_allowed_origin("https://app.example.com".to_string())
            .with_escalation_mode(EscalationMode::Progressive);

        assert_eq!(config.token_ttl_minutes(), 30);
        assert_eq!(config.allowed_origins(), ["https://app.example.com"]);
        assert_eq!(config.lockout().mode, EscalationMode::Progressive);
    }

    #[test]
    fn auth_state_exposes_config_and_issuer() {
        let config = AuthConfig::new().with_token_ttl_minutes(15);
        let issuer = TokenIssuer::new(&SecretString::from("secret"), 15);
        let state = AuthState::new(config, issuer);
        assert_eq!(state.config().token_ttl_minutes(), 15);
    }
}

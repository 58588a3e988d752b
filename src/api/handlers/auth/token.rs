//! Session token issuance and verification.
//!
//! Tokens are signed HS256 assertions with a fixed lifetime. There is no
//! revocation: an unexpired token stays valid, which is why password
//! freshness is always re-checked against the live record rather than the
//! `password_changed_at` snapshot embedded here.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: String,
    /// Unix-seconds snapshot of when the password last changed. Informational
    /// only; freshness checks go to the store.
    pub password_changed_at: i64,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &SecretString, ttl_minutes: i64) -> Self {
        let secret = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Mint an assertion for a successfully authenticated user.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue(
        &self,
        user_id: Uuid,
        username: &str,
        role: &str,
        password_changed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            role: role.to_string(),
            password_changed_at: password_changed_at.timestamp(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// # Errors
    ///
    /// Returns an error for tampered, malformed, or expired tokens.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &Validation::default()).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(ttl_minutes: i64) -> TokenIssuer {
        TokenIssuer::new(&SecretString::from("test-signing-secret"), ttl_minutes)
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let issuer = issuer(120);
        let user_id = Uuid::new_v4();
        let changed_at = Utc::now() - chrono::Duration::days(3);

        let token = issuer
            .issue(user_id, "alice", "user", changed_at, Utc::now())
            .unwrap();
        let claims = issuer.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.password_changed_at, changed_at.timestamp());
        assert_eq!(claims.exp - claims.iat, 120 * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        // Issue far enough in the past to clear the default leeway.
        let issuer = issuer(1);
        let token = issuer
            .issue(
                Uuid::new_v4(),
                "alice",
                "user",
                Utc::now(),
                Utc::now() - chrono::Duration::minutes(10),
            )
            .unwrap();
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issuer(120)
            .issue(Uuid::new_v4(), "alice", "user", Utc::now(), Utc::now())
            .unwrap();
        let other = TokenIssuer::new(&SecretString::from("different-secret"), 120);
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let issuer = issuer(120);
        let mut token = issuer
            .issue(Uuid::new_v4(), "alice", "user", Utc::now(), Utc::now())
            .unwrap();
        token.push('x');
        assert!(issuer.verify(&token).is_err());
    }
}

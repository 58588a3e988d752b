//! Password strength and lifecycle policy.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Characters accepted as "special" by the strength check.
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

/// Exact-match deny-list of known-weak passwords.
static DENIED_PASSWORDS: &[&str] = &[
    "Password123!",
    "Admin123!",
    "Welcome123!",
    "Changeme123!",
    "Aa@123456789",
];

#[derive(Clone, Copy, Debug)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
    pub max_age_days: i64,
    pub history_window: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 12,
            max_length: 128,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
            max_age_days: 90,
            history_window: 5,
        }
    }
}

/// One broken strength rule. The check reports every broken rule, not just
/// the first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyViolation {
    TooShort { min: usize },
    TooLong { max: usize },
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
    MissingSpecial,
    Denied,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { min } => {
                write!(f, "Password must be at least {min} characters")
            }
            Self::TooLong { max } => {
                write!(f, "Password must not exceed {max} characters")
            }
            Self::MissingUppercase => {
                write!(f, "Password must contain at least one uppercase letter")
            }
            Self::MissingLowercase => {
                write!(f, "Password must contain at least one lowercase letter")
            }
            Self::MissingDigit => write!(f, "Password must contain at least one number"),
            Self::MissingSpecial => {
                write!(f, "Password must contain at least one special character")
            }
            Self::Denied => write!(f, "Password is too common, choose another one"),
        }
    }
}

impl PasswordPolicy {
    /// Validate a candidate against every strength rule.
    ///
    /// # Errors
    ///
    /// Returns the full list of broken rules.
    pub fn validate_strength(&self, password: &str) -> Result<(), Vec<PolicyViolation>> {
        let mut violations = Vec::new();
        let length = password.chars().count();

        if length < self.min_length {
            violations.push(PolicyViolation::TooShort {
                min: self.min_length,
            });
        }
        if length > self.max_length {
            violations.push(PolicyViolation::TooLong {
                max: self.max_length,
            });
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            violations.push(PolicyViolation::MissingUppercase);
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            violations.push(PolicyViolation::MissingLowercase);
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push(PolicyViolation::MissingDigit);
        }
        if self.require_special && !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
            violations.push(PolicyViolation::MissingSpecial);
        }
        if DENIED_PASSWORDS.contains(&password) {
            violations.push(PolicyViolation::Denied);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// True iff the password is older than the maximum age.
    #[must_use]
    pub fn is_expired(&self, changed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now > changed_at + Duration::days(self.max_age_days)
    }

    /// When a password changed at `changed_at` will expire.
    #[must_use]
    pub fn next_expiry(&self, changed_at: DateTime<Utc>) -> DateTime<Utc> {
        changed_at + Duration::days(self.max_age_days)
    }
}

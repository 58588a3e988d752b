//! # Warden (Account Security & Authentication)
//!
//! `warden` authenticates users against stored credentials, enforces a
//! password lifecycle policy, and protects accounts from brute-force guessing.
//!
//! ## Lockout
//!
//! Failed logins are counted per account. Once the threshold is reached the
//! account enters a temporary lock whose duration is taken from an escalation
//! table (30s up to 1h). An administrator can additionally impose a permanent
//! lock, which is checked before everything else and carries no timing
//! information in its rejection.
//!
//! ## Password lifecycle
//!
//! Passwords must satisfy a strength policy (length, character classes, a
//! deny-list of known-weak passwords), may not match any of the last five
//! used passwords (verified one-way, hashes are never compared directly), and
//! expire after 90 days. Expired passwords short-circuit authenticated
//! requests with a machine-readable error until changed.
//!
//! ## Sessions
//!
//! A successful login mints a signed, fixed-lifetime token carrying the
//! account's role and a password-freshness snapshot. Tokens are not revocable;
//! freshness checks always consult the live record rather than the snapshot.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}

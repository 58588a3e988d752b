//! Bounded, ordered password reuse history.
//!
//! The stored column predates this service and may hold three shapes: a JSON
//! array of PHC strings (current), a single bare hash (legacy), or garbage.
//! [`PasswordHistory::from_stored`] migrates legacy rows on read and treats
//! unparseable data as an empty history, a deliberate availability-over-
//! strictness tradeoff: a corrupt column must not block a password change.
//! Writes always serialize the array shape, so legacy rows disappear the next
//! time the user changes their password.
//!
//! Membership is decided only by one-way verification of the candidate
//! against each stored hash; hashes are never compared to each other.

use super::utils::verify_password;
use anyhow::{Context, Result};
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordHistory {
    window: usize,
    entries: Vec<String>,
}

impl PasswordHistory {
    #[must_use]
    pub fn empty(window: usize) -> Self {
        Self {
            window,
            entries: Vec::new(),
        }
    }

    /// Migrate whatever shape the store holds into the typed collection.
    #[must_use]
    pub fn from_stored(raw: Option<&str>, window: usize) -> Self {
        let mut history = Self::empty(window);

        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return history;
        };

        if raw.starts_with('[') {
            match serde_json::from_str::<Vec<String>>(raw) {
                Ok(entries) => history.entries = entries,
                Err(err) => {
                    // Fail open: corrupt history must not block the change.
                    warn!("unparseable password history, treating as empty: {err}");
                }
            }
        } else {
            // Legacy rows stored a single bare hash.
            history.entries = vec![raw.to_string()];
        }

        history.entries.truncate(window);
        history
    }

    /// One-way verify the candidate against each stored hash, newest first.
    #[must_use]
    pub fn contains(&self, candidate: &str) -> bool {
        self.entries
            .iter()
            .any(|hash| verify_password(candidate, hash))
    }

    /// Prepend the newest hash and drop anything beyond the window.
    pub fn remember(&mut self, hash: String) {
        self.entries.insert(0, hash);
        self.entries.truncate(self.window);
    }

    /// Serialize for storage, always in the array shape.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_stored(&self) -> Result<String> {
        serde_json::to_string(&self.entries).context("failed to serialize password history")
    }

    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::super::utils::hash_password;
    use super::*;

    const WINDOW: usize = 5;

    #[test]
    fn missing_and_blank_columns_are_empty() {
        assert!(PasswordHistory::from_stored(None, WINDOW).is_empty());
        assert!(PasswordHistory::from_stored(Some(""), WINDOW).is_empty());
        assert!(PasswordHistory::from_stored(Some("   "), WINDOW).is_empty());
    }

    #[test]
    fn legacy_bare_hash_becomes_single_entry() {
        let history = PasswordHistory::from_stored(Some("$argon2id$v=19$legacy"), WINDOW);
        assert_eq!(history.entries(), ["$argon2id$v=19$legacy"]);
    }

    #[test]
    fn json_array_round_trips() {
        let mut history = PasswordHistory::empty(WINDOW);
        history.remember("hash-b".to_string());
        history.remember("hash-a".to_string());

        let stored = history.to_stored().unwrap();
        let reloaded = PasswordHistory::from_stored(Some(&stored), WINDOW);
        assert_eq!(reloaded.entries(), ["hash-a", "hash-b"]);
    }

    #[test]
    fn garbage_fails_open_to_empty() {
        assert!(PasswordHistory::from_stored(Some("[not json"), WINDOW).is_empty());
        assert!(PasswordHistory::from_stored(Some("[1, 2, 3]"), WINDOW).is_empty());
    }

    #[test]
    fn remember_is_newest_first_and_bounded() {
        let mut history = PasswordHistory::empty(3);
        for n in 1..=5 {
            history.remember(format!("hash-{n}"));
        }
        assert_eq!(history.entries(), ["hash-5", "hash-4", "hash-3"]);
    }

    #[test]
    fn oversized_stored_list_is_truncated_on_read() {
        let entries: Vec<String> = (1..=8).map(|n| format!("hash-{n}")).collect();
        let stored = serde_json::to_string(&entries).unwrap();
        let history = PasswordHistory::from_stored(Some(&stored), WINDOW);
        assert_eq!(history.entries().len(), WINDOW);
        assert_eq!(history.entries()[0], "hash-1");
    }

    #[test]
    fn contains_verifies_one_way() {
        let mut history = PasswordHistory::empty(WINDOW);
        history.remember(hash_password("Old-Password77!").unwrap());

        assert!(history.contains("Old-Password77!"));
        assert!(!history.contains("Different-Password77!"));
    }

    #[test]
    fn reuse_outside_window_is_allowed() {
        let mut history = PasswordHistory::empty(2);
        let oldest = hash_password("Oldest-Password1!").unwrap();
        history.remember(oldest);
        history.remember(hash_password("Middle-Password2!").unwrap());
        history.remember(hash_password("Newest-Password3!").unwrap());

        // "Oldest" fell out of the two-entry window.
        assert!(!history.contains("Oldest-Password1!"));
        assert!(history.contains("Newest-Password3!"));
    }
}

//! Failed-login lockout state machine.
//!
//! All transition logic lives in pure functions over [`Counters`] so it can be
//! tested without storage. The storage layer applies the result inside a
//! single transaction with a row lock (`SELECT .. FOR UPDATE`), which keeps
//! concurrent failure bookkeeping from losing updates.
//!
//! The administrator lock (`is_locked`) is unconditional and evaluated before
//! the temporary window. A temporary lock opens once the failed-attempt
//! counter reaches the threshold; its duration comes from an escalation table.
//! The counter is clamped to the threshold in storage, which under
//! [`EscalationMode::Saturating`] means repeated violations recompute the tier
//! from a value that can never grow past threshold+1 and the escalation stalls
//! at the second tier. [`EscalationMode::Progressive`] derives the tier from a
//! separately tracked, unclamped violation count instead and walks the whole
//! table.

use chrono::{DateTime, Duration, Utc};

/// Lock durations in seconds: 30s, 1m, 5m, 15m, 1h.
pub const LOCKOUT_STEPS_SECONDS: [i64; 5] = [30, 60, 300, 900, 3600];

/// Stored failed-attempt ceiling; also the lock threshold.
pub const MAX_FAILED_ATTEMPTS: i32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscalationMode {
    /// Tier recomputed from the clamped attempt counter (legacy behavior).
    Saturating,
    /// Tier taken from the unclamped violation counter.
    Progressive,
}

#[derive(Clone, Copy, Debug)]
pub struct LockoutPolicy {
    pub max_attempts: i32,
    pub steps_seconds: &'static [i64],
    pub mode: EscalationMode,
}

impl LockoutPolicy {
    #[must_use]
    pub fn new(mode: EscalationMode) -> Self {
        Self {
            max_attempts: MAX_FAILED_ATTEMPTS,
            steps_seconds: &LOCKOUT_STEPS_SECONDS,
            mode,
        }
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::new(EscalationMode::Saturating)
    }
}

/// The mutable per-account slice of lockout state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Counters {
    pub attempts: i32,
    pub violations: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Whether an authentication attempt may proceed to credential verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    PermanentlyLocked,
    TemporarilyLocked { remaining_seconds: i64 },
    Open,
}

/// Evaluate the gates in precedence order: administrator lock first, then the
/// temporary window. Neither gate touches any counter.
#[must_use]
pub fn gate(is_locked: bool, lockout_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Gate {
    if is_locked {
        return Gate::PermanentlyLocked;
    }

    if let Some(until) = lockout_until {
        if until > now {
            return Gate::TemporarilyLocked {
                remaining_seconds: remaining_seconds(until, now),
            };
        }
    }

    Gate::Open
}

/// Seconds left in a lockout window, rounded up.
#[must_use]
pub fn remaining_seconds(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (until - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis + 999) / 1000
    }
}

/// Apply one failed verification: increment, and once the threshold is
/// reached open a lock and clamp the persisted counter to the threshold.
#[must_use]
pub fn on_failure(policy: &LockoutPolicy, prior: Counters, now: DateTime<Utc>) -> Counters {
    let attempts = prior.attempts.saturating_add(1);

    if attempts >= policy.max_attempts {
        let tier = match policy.mode {
            EscalationMode::Saturating => attempts - policy.max_attempts,
            EscalationMode::Progressive => prior.violations,
        };
        let tier = usize::try_from(tier.max(0))
            .unwrap_or(0)
            .min(policy.steps_seconds.len() - 1);

        Counters {
            attempts: policy.max_attempts,
            violations: prior.violations.saturating_add(1),
            locked_until: Some(now + Duration::seconds(policy.steps_seconds[tier])),
        }
    } else {
        Counters {
            attempts,
            violations: prior.violations,
            locked_until: None,
        }
    }
}

/// A successful verification wipes the slate regardless of prior state.
#[must_use]
pub fn on_success() -> Counters {
    Counters {
        attempts: 0,
        violations: 0,
        locked_until: None,
    }
}

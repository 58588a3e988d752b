//! Login-alert delivery, decoupled from the request path.
//!
//! A successful login enqueues a [`LoginAlert`] on a bounded channel and
//! moves on; the response never waits for delivery. A detached worker drains
//! the channel and hands each alert to an [`AlertSender`], retrying failures
//! with exponential backoff and jitter up to a max attempt count. A full
//! queue drops the alert with a warning; delivery is advisory and its
//! failure is never allowed to reach the caller.
//!
//! The default sender for local dev is [`LogAlertSender`], which logs the
//! payload and returns `Ok(())`. Real transports implement [`AlertSender`].

use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::handlers::auth::storage::update_last_login_notification;

#[derive(Clone, Debug)]
pub struct LoginAlert {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub login_time: DateTime<Utc>,
    pub ip: Option<String>,
    pub browser: Option<String>,
}

/// Alert delivery abstraction used by the worker.
pub trait AlertSender: Send + Sync {
    /// Deliver an alert or return an error to trigger a retry.
    ///
    /// # Errors
    ///
    /// Returns an error when delivery failed.
    fn send(&self, alert: &LoginAlert) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogAlertSender;

impl AlertSender for LogAlertSender {
    fn send(&self, alert: &LoginAlert) -> Result<()> {
        info!(
            to_email = %alert.email,
            username = %alert.username,
            login_time = %alert.login_time.to_rfc3339(),
            ip = alert.ip.as_deref().unwrap_or("unknown"),
            browser = alert.browser.as_deref().unwrap_or("unknown"),
            "login alert send stub"
        );
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct AlertWorkerConfig {
    queue_capacity: usize,
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl AlertWorkerConfig {
    /// Defaults: 64-deep queue, 5 attempts, 5s->5m exponential backoff.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue_capacity: 64,
            max_attempts: 5,
            backoff_base: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
        }
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_backoff_base_seconds(mut self, seconds: u64) -> Self {
        self.backoff_base = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_backoff_max_seconds(mut self, seconds: u64) -> Self {
        self.backoff_max = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn normalize(self) -> Self {
        let queue_capacity = self.queue_capacity.max(1);
        let max_attempts = self.max_attempts.max(1);
        let backoff_base = if self.backoff_base.is_zero() {
            Duration::from_secs(1)
        } else {
            self.backoff_base
        };
        let backoff_max = if self.backoff_max < backoff_base {
            backoff_base
        } else {
            self.backoff_max
        };
        Self {
            queue_capacity,
            max_attempts,
            backoff_base,
            backoff_max,
        }
    }

    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    #[must_use]
    pub fn backoff_max(&self) -> Duration {
        self.backoff_max
    }
}

impl Default for AlertWorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle used by request handlers to enqueue alerts without waiting.
#[derive(Clone)]
pub struct AlertQueue {
    tx: mpsc::Sender<LoginAlert>,
}

impl AlertQueue {
    /// Enqueue without blocking. Returns whether the alert was accepted;
    /// callers are free to ignore the answer.
    pub fn enqueue(&self, alert: LoginAlert) -> bool {
        match self.tx.try_send(alert) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(alert)) => {
                warn!("alert queue full, dropping login alert for {}", alert.username);
                false
            }
            Err(mpsc::error::TrySendError::Closed(alert)) => {
                warn!("alert worker gone, dropping login alert for {}", alert.username);
                false
            }
        }
    }
}

/// Spawn the detached delivery worker and return the queue handle.
pub fn spawn_alert_worker(
    pool: PgPool,
    sender: Arc<dyn AlertSender>,
    config: AlertWorkerConfig,
) -> (AlertQueue, tokio::task::JoinHandle<()>) {
    let config = config.normalize();
    let (tx, mut rx) = mpsc::channel(config.queue_capacity());

    let handle = tokio::spawn(async move {
        while let Some(alert) = rx.recv().await {
            if attempt_delivery(sender.as_ref(), &config, &alert).await {
                // Advisory bookkeeping; a failure here is logged and ignored.
                if let Err(err) =
                    update_last_login_notification(&pool, alert.user_id, Utc::now()).await
                {
                    warn!("failed to stamp login notification time: {err:?}");
                }
            }
        }
    });

    (AlertQueue { tx }, handle)
}

/// Try to deliver one alert, retrying with backoff. Returns whether any
/// attempt succeeded.
async fn attempt_delivery(
    sender: &dyn AlertSender,
    config: &AlertWorkerConfig,
    alert: &LoginAlert,
) -> bool {
    let max_attempts = config.max_attempts();
    for attempt in 1..=max_attempts {
        match sender.send(alert) {
            Ok(()) => return true,
            Err(err) => {
                warn!(
                    attempt,
                    max_attempts, "login alert delivery failed: {err}"
                );
                if attempt < max_attempts {
                    sleep(backoff_delay(
                        attempt,
                        config.backoff_base(),
                        config.backoff_max(),
                    ))
                    .await;
                }
            }
        }
    }

    error!(
        "giving up on login alert for {} after {max_attempts} attempts",
        alert.username
    );
    false
}

fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let shift = attempt.saturating_sub(1).min(31);
    let factor = 1u32 << shift;
    let delay = base.checked_mul(factor).unwrap_or(max);
    let capped = if delay > max { max } else { delay };
    jitter_delay(capped)
}

fn jitter_delay(delay: Duration) -> Duration {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    if delay_ms < 2 {
        return delay;
    }
    let half = delay_ms / 2;
    let jitter = rand::thread_rng().gen_range(0..=half);
    Duration::from_millis(half + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn alert() -> LoginAlert {
        LoginAlert {
            user_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            login_time: Utc::now(),
            ip: Some("1.2.3.4".to_string()),
            browser: Some("curl/8.5".to_string()),
        }
    }

    struct FlakySender {
        failures: u32,
        calls: AtomicU32,
    }

    impl AlertSender for FlakySender {
        fn send(&self, _alert: &LoginAlert) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(anyhow!("smtp unavailable"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn config_normalize_enforces_floors() {
        let config = AlertWorkerConfig::new()
            .with_queue_capacity(0)
            .with_max_attempts(0)
            .with_backoff_base_seconds(0)
            .with_backoff_max_seconds(0)
            .normalize();

        assert_eq!(config.queue_capacity(), 1);
        assert_eq!(config.max_attempts(), 1);
        assert_eq!(config.backoff_base(), Duration::from_secs(1));
        assert!(config.backoff_max() >= config.backoff_base());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let base = Duration::from_secs(5);
        let max = Duration::from_secs(300);
        // Jitter keeps the delay within [half, full] of the deterministic value.
        let first = backoff_delay(1, base, max);
        assert!(first >= Duration::from_millis(2500) && first <= base);
        let late = backoff_delay(20, base, max);
        assert!(late >= Duration::from_millis(150_000) && late <= max);
    }

    #[test]
    fn log_sender_always_succeeds() {
        assert!(LogAlertSender.send(&alert()).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_retries_until_success() {
        let sender = FlakySender {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let config = AlertWorkerConfig::new().normalize();

        assert!(attempt_delivery(&sender, &config, &alert()).await);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_gives_up_after_max_attempts() {
        let sender = FlakySender {
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        };
        let config = AlertWorkerConfig::new().with_max_attempts(3).normalize();

        assert!(!attempt_delivery(&sender, &config, &alert()).await);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let queue = AlertQueue { tx };

        assert!(queue.enqueue(alert()));
        // No worker is draining; the second enqueue must drop, not block.
        assert!(!queue.enqueue(alert()));
    }

    #[tokio::test]
    async fn closed_queue_drops_without_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let queue = AlertQueue { tx };
        assert!(!queue.enqueue(alert()));
    }
}

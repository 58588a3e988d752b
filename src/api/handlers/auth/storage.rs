//! Database operations for accounts, lockout counters, and password history.
//!
//! Counter updates run inside a transaction holding a row lock so two
//! concurrent failed-login evaluations against the same account serialize
//! instead of losing updates. The password rotation writes the new hash and
//! the history entry in the same transaction for the same reason.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    history::PasswordHistory,
    lockout::{self, Counters, LockoutPolicy},
    types::AdminUserRow,
    utils::is_unique_violation,
};

/// Outcome when inserting a new account.
#[derive(Debug)]
pub(crate) enum InsertOutcome {
    Created(Uuid),
    Conflict,
}

/// The full row slice the login flow operates on.
pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) username: String,
    pub(crate) password_hash: String,
    pub(crate) role: String,
    pub(crate) email: Option<String>,
    pub(crate) receive_login_alerts: bool,
    pub(crate) failed_login_attempts: i32,
    pub(crate) lockout_violations: i32,
    pub(crate) is_locked: bool,
    pub(crate) lockout_until: Option<DateTime<Utc>>,
    pub(crate) password_changed_at: DateTime<Utc>,
}

pub(crate) struct ProfileRecord {
    pub(crate) id: Uuid,
    pub(crate) username: String,
    pub(crate) full_name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) password_changed_at: DateTime<Utc>,
    pub(crate) receive_login_alerts: bool,
}

const USER_COLUMNS: &str = "id, username, password_hash, role, email, receive_login_alerts, \
     failed_login_attempts, lockout_violations, is_locked, lockout_until, password_changed_at";

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
        email: row.get("email"),
        receive_login_alerts: row.get("receive_login_alerts"),
        failed_login_attempts: row.get("failed_login_attempts"),
        lockout_violations: row.get("lockout_violations"),
        is_locked: row.get("is_locked"),
        lockout_until: row.get("lockout_until"),
        password_changed_at: row.get("password_changed_at"),
    }
}

pub(crate) async fn fetch_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch user by username")?;

    Ok(row.as_ref().map(user_from_row))
}

pub(crate) async fn fetch_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch user by id")?;

    Ok(row.as_ref().map(user_from_row))
}

pub(crate) async fn insert_user(
    pool: &PgPool,
    username: &str,
    password_hash: &str,
    role: &str,
    receive_login_alerts: bool,
) -> Result<InsertOutcome> {
    let query = r"
        INSERT INTO users
            (username, password_hash, role, receive_login_alerts)
        VALUES ($1, $2, $3, $4)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .bind(receive_login_alerts)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(InsertOutcome::Created(row.get("id"))),
        Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Apply one failed login under a row lock and return the new counters.
pub(crate) async fn record_login_failure(
    pool: &PgPool,
    user_id: Uuid,
    policy: &LockoutPolicy,
    now: DateTime<Utc>,
) -> Result<Counters> {
    let mut tx = pool
        .begin()
        .await
        .context("failed to begin lockout transaction")?;

    let row = sqlx::query(
        "SELECT failed_login_attempts, lockout_violations FROM users WHERE id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await
    .context("failed to lock user row")?;

    let prior = Counters {
        attempts: row.get("failed_login_attempts"),
        violations: row.get("lockout_violations"),
        locked_until: None,
    };
    let next = lockout::on_failure(policy, prior, now);

    sqlx::query(
        "UPDATE users SET failed_login_attempts = $2, lockout_violations = $3, lockout_until = $4 \
         WHERE id = $1",
    )
    .bind(user_id)
    .bind(next.attempts)
    .bind(next.violations)
    .bind(next.locked_until)
    .execute(&mut *tx)
    .await
    .context("failed to update lockout counters")?;

    tx.commit()
        .await
        .context("failed to commit lockout transaction")?;

    Ok(next)
}

/// Reset counters and clear the lock window after a successful login.
pub(crate) async fn reset_login_state(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = "UPDATE users SET failed_login_attempts = 0, lockout_violations = 0, \
                 lockout_until = NULL WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to reset login state")?;

    Ok(())
}

/// Raw history column for the reuse check.
pub(crate) async fn fetch_password_history(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<String>> {
    let row = sqlx::query("SELECT password_history FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch password history")?;

    Ok(row.and_then(|row| row.get("password_history")))
}

/// Swap in a new password hash and record it in the history, atomically.
///
/// The history is re-read under the row lock so concurrent changes serialize;
/// whatever legacy shape the column held is rewritten as the typed list.
pub(crate) async fn rotate_password(
    pool: &PgPool,
    user_id: Uuid,
    new_hash: &str,
    window: usize,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("failed to begin password rotation")?;

    let row = sqlx::query("SELECT password_history FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .context("failed to lock user row for password rotation")?;

    let raw: Option<String> = row.get("password_history");
    let mut history = PasswordHistory::from_stored(raw.as_deref(), window);
    history.remember(new_hash.to_string());
    let stored = history.to_stored()?;

    sqlx::query(
        "UPDATE users SET password_hash = $2, password_changed_at = $3, \
         failed_login_attempts = 0, lockout_violations = 0, lockout_until = NULL, \
         password_history = $4 WHERE id = $1",
    )
    .bind(user_id)
    .bind(new_hash)
    .bind(now)
    .bind(stored)
    .execute(&mut *tx)
    .await
    .context("failed to rotate password")?;

    tx.commit()
        .await
        .context("failed to commit password rotation")?;

    Ok(())
}

/// Live freshness read for the expiry middleware; never trusts the token
/// snapshot.
pub(crate) async fn fetch_password_changed_at(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<DateTime<Utc>>> {
    let row = sqlx::query("SELECT password_changed_at FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch password age")?;

    Ok(row.map(|row| row.get("password_changed_at")))
}

pub(crate) async fn fetch_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<ProfileRecord>> {
    let row = sqlx::query(
        "SELECT id, username, full_name, email, phone, password_changed_at, \
         receive_login_alerts FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch profile")?;

    Ok(row.map(|row| ProfileRecord {
        id: row.get("id"),
        username: row.get("username"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        password_changed_at: row.get("password_changed_at"),
        receive_login_alerts: row.get("receive_login_alerts"),
    }))
}

pub(crate) async fn email_taken_by_other(
    pool: &PgPool,
    email: &str,
    user_id: Uuid,
) -> Result<bool> {
    let row = sqlx::query("SELECT id FROM users WHERE email = $1 AND id != $2")
        .bind(email)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("failed to check email uniqueness")?;

    Ok(row.is_some())
}

pub(crate) async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    full_name: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET full_name = $2, email = $3, phone = $4 WHERE id = $1",
    )
    .bind(user_id)
    .bind(full_name)
    .bind(email)
    .bind(phone)
    .execute(pool)
    .await
    .context("failed to update profile")?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn update_email_settings(
    pool: &PgPool,
    user_id: Uuid,
    receive_login_alerts: bool,
) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET receive_login_alerts = $2 WHERE id = $1")
        .bind(user_id)
        .bind(receive_login_alerts)
        .execute(pool)
        .await
        .context("failed to update email settings")?;

    Ok(result.rows_affected() > 0)
}

/// Stamp the moment a login alert was delivered. Advisory; callers log and
/// continue on failure.
pub(crate) async fn update_last_login_notification(
    pool: &PgPool,
    user_id: Uuid,
    when: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE users SET last_login_notification = $2 WHERE id = $1")
        .bind(user_id)
        .bind(when)
        .execute(pool)
        .await
        .context("failed to update last login notification")?;

    Ok(())
}

/// Set or clear the administrator lock. Clearing it also closes any
/// temporary window and zeroes the counters.
pub(crate) async fn set_locked(pool: &PgPool, user_id: Uuid, locked: bool) -> Result<bool> {
    let query = if locked {
        "UPDATE users SET is_locked = TRUE WHERE id = $1"
    } else {
        "UPDATE users SET is_locked = FALSE, lockout_until = NULL, \
         failed_login_attempts = 0, lockout_violations = 0 WHERE id = $1"
    };
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update lock state")?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_users(pool: &PgPool) -> Result<Vec<AdminUserRow>> {
    let rows = sqlx::query(
        "SELECT id, username, role, is_locked, failed_login_attempts, lockout_until, \
         password_changed_at, created_at FROM users ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("failed to list users")?;

    Ok(rows
        .into_iter()
        .map(|row| AdminUserRow {
            id: row.get("id"),
            username: row.get("username"),
            role: row.get("role"),
            is_locked: row.get("is_locked"),
            failed_login_attempts: row.get("failed_login_attempts"),
            lockout_until: row.get("lockout_until"),
            password_changed_at: row.get("password_changed_at"),
            created_at: row.get("created_at"),
        })
        .collect())
}

/// Create the bootstrap administrator if no admin row exists yet.
/// Returns true when a row was created.
pub(crate) async fn ensure_default_admin(pool: &PgPool, password_hash: &str) -> Result<bool> {
    let existing = sqlx::query("SELECT id FROM users WHERE role = 'admin' LIMIT 1")
        .fetch_optional(pool)
        .await
        .context("failed to check for an administrator")?;

    if existing.is_some() {
        return Ok(false);
    }

    let result = sqlx::query(
        "INSERT INTO users (username, password_hash, role) VALUES ('admin', $1, 'admin') \
         ON CONFLICT (username) DO NOTHING",
    )
    .bind(password_hash)
    .execute(pool)
    .await
    .context("failed to create default administrator")?;

    Ok(result.rows_affected() > 0)
}

//! Key store - durable records of issued keys and their bindings.
//!
//! All operations run against the shared pool and are atomic with respect to
//! a single key name. The one correctness-critical race in the system lives
//! here: two concurrent get-or-bind calls for the same name must produce
//! exactly one winner, which `bind_if_unassigned` settles with a conditional
//! UPDATE rather than a read-then-write.

use chrono::{DateTime, Duration, Utc};

use crate::{
    db::DbPool,
    error::AppError,
    keygen,
    models::{
        admin::GateStats,
        key::{Key, STATUS_ASSIGNED},
    },
};

/// Upper bound on key lifetime: one year in hours.
///
/// Durations come from client requests and configuration; bounding them
/// keeps the expiry arithmetic below inside chrono's representable range.
pub const MAX_KEY_DURATION_HOURS: i64 = 24 * 365;

/// Compute an expiry instant, rejecting out-of-range durations.
///
/// # Errors
///
/// `InvalidDuration` unless `1 <= duration_hours <= MAX_KEY_DURATION_HOURS`.
fn expiry_after_hours(
    now: DateTime<Utc>,
    duration_hours: i64,
) -> Result<DateTime<Utc>, AppError> {
    if !(1..=MAX_KEY_DURATION_HOURS).contains(&duration_hours) {
        return Err(AppError::InvalidDuration);
    }
    Ok(now + Duration::hours(duration_hours))
}

/// Outcome of a bind attempt for a key name and hardware id.
#[derive(Debug)]
pub enum BindOutcome {
    /// This caller won the bind; `assigned_to`/`assigned_at`/`status` were
    /// just set.
    BoundNow(Key),
    /// The key was already bound to the same hardware id (idempotent re-fetch).
    AlreadyBoundToSame(Key),
    /// The key belongs to a different hardware id.
    BoundToOther,
}

/// Create a key with a caller-chosen name.
///
/// # Errors
///
/// - `InvalidDuration` if the requested lifetime is out of range
/// - `NameTaken` if a key with this name already exists (unique constraint)
/// - `Database` for any other store failure
pub async fn create_named(
    pool: &DbPool,
    name: &str,
    duration_hours: i64,
) -> Result<Key, AppError> {
    let expires_at = expiry_after_hours(Utc::now(), duration_hours)?;

    let result = sqlx::query_as::<_, Key>(
        r#"
        INSERT INTO keys (name, value, status, expires_at)
        VALUES ($1, $2, 'available', $3)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(keygen::generate())
    .bind(expires_at)
    .fetch_one(pool)
    .await;

    match result {
        Ok(key) => Ok(key),
        // Unique violation on `name` means the key already exists
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(AppError::NameTaken),
        Err(err) => Err(err.into()),
    }
}

/// Look a key up by name, expired or not.
pub async fn find_by_name(pool: &DbPool, name: &str) -> Result<Option<Key>, AppError> {
    let key = sqlx::query_as::<_, Key>("SELECT * FROM keys WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(key)
}

/// Look a key up by name, filtering out expired records.
pub async fn find_unexpired_by_name(pool: &DbPool, name: &str) -> Result<Option<Key>, AppError> {
    let key = sqlx::query_as::<_, Key>("SELECT * FROM keys WHERE name = $1 AND expires_at > NOW()")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(key)
}

/// Find the unexpired key bound to a hardware id, if any.
///
/// The self-service flow allows one active key per hardware id under this
/// lookup; historical (expired) bindings are ignored.
pub async fn find_active_by_hardware_id(
    pool: &DbPool,
    hwid: &str,
) -> Result<Option<Key>, AppError> {
    let key = sqlx::query_as::<_, Key>(
        r#"
        SELECT * FROM keys
        WHERE assigned_to = $1 AND expires_at > NOW()
        ORDER BY expires_at DESC
        LIMIT 1
        "#,
    )
    .bind(hwid)
    .fetch_optional(pool)
    .await?;

    Ok(key)
}

/// Atomically bind a key to a hardware id if it is still unassigned.
///
/// # Concurrency
///
/// The UPDATE carries `assigned_to IS NULL` in its WHERE clause, so the
/// database settles concurrent callers: exactly one observes `BoundNow`,
/// every other caller falls through to the re-read below and observes the
/// winner's binding.
///
/// # Errors
///
/// `KeyNotFound` if the key vanished or expired between lookup and bind.
pub async fn bind_if_unassigned(
    pool: &DbPool,
    name: &str,
    hwid: &str,
) -> Result<BindOutcome, AppError> {
    // Compare-and-set: only an unassigned, unexpired key can be claimed
    let bound = sqlx::query_as::<_, Key>(
        r#"
        UPDATE keys
        SET assigned_to = $2,
            assigned_at = NOW(),
            status = $3
        WHERE name = $1 AND assigned_to IS NULL AND expires_at > NOW()
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(hwid)
    .bind(STATUS_ASSIGNED)
    .fetch_optional(pool)
    .await?;

    if let Some(key) = bound {
        return Ok(BindOutcome::BoundNow(key));
    }

    // CAS failed: re-read to report who holds the key now
    let current = find_by_name(pool, name).await?.ok_or(AppError::KeyNotFound)?;
    classify_bound_key(current, hwid, Utc::now())
}

/// Classify a key that could not be claimed by the conditional update.
///
/// Pure decision over the re-read row: an expired key reads as not found,
/// a key held by this hardware id is an idempotent success, anything else
/// belongs to someone else (including the race loser case, where another
/// caller claimed the key between our CAS and this read).
fn classify_bound_key(
    key: Key,
    hwid: &str,
    now: DateTime<Utc>,
) -> Result<BindOutcome, AppError> {
    if key.is_expired_at(now) {
        return Err(AppError::KeyNotFound);
    }
    match key.assigned_to.as_deref() {
        Some(owner) if owner == hwid => Ok(BindOutcome::AlreadyBoundToSame(key)),
        _ => Ok(BindOutcome::BoundToOther),
    }
}

/// Create a key for the step-3 self-service path, pre-bound to the hardware id.
///
/// The name is derived from the hardware id prefix plus the creation
/// timestamp in milliseconds, which keeps self-service names out of the way
/// of human-chosen ones.
pub async fn create_for_hardware_id(
    pool: &DbPool,
    hwid: &str,
    duration_hours: i64,
) -> Result<Key, AppError> {
    let now = Utc::now();
    let name = derived_key_name(hwid, now);
    let expires_at = expiry_after_hours(now, duration_hours)?;

    let key = sqlx::query_as::<_, Key>(
        r#"
        INSERT INTO keys (name, value, status, assigned_to, assigned_at, expires_at)
        VALUES ($1, $2, $3, $4, NOW(), $5)
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(keygen::generate())
    .bind(STATUS_ASSIGNED)
    .bind(hwid)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;

    Ok(key)
}

/// Derive a self-service key name from a hardware id and creation instant.
///
/// Uses the first 8 characters of the (already validated) hardware id,
/// mapped into the key-name charset, plus the millisecond timestamp.
fn derived_key_name(hwid: &str, now: DateTime<Utc>) -> String {
    let prefix: String = hwid
        .chars()
        .take(8)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("{}-{}", prefix, now.timestamp_millis())
}

/// List every key record, newest first. Admin only.
pub async fn list_all(pool: &DbPool) -> Result<Vec<Key>, AppError> {
    let keys = sqlx::query_as::<_, Key>("SELECT * FROM keys ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;

    Ok(keys)
}

/// Aggregate counters over the three collections. Admin only.
pub async fn stats(pool: &DbPool) -> Result<GateStats, AppError> {
    let stats = sqlx::query_as::<_, GateStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM keys) AS total_keys,
            (SELECT COUNT(*) FROM keys WHERE status = 'assigned') AS assigned_keys,
            (SELECT COUNT(*) FROM keys WHERE status = 'available') AS available_keys,
            (SELECT COUNT(*) FROM keys WHERE expires_at <= NOW()) AS expired_keys,
            (SELECT COUNT(*) FROM step_progress) AS total_users,
            (SELECT COUNT(*) FROM audit_log) AS total_events
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(stats)
}

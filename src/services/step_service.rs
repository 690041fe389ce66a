//! Step tracker - durable per-hardware-id progress through the 3-step flow.
//!
//! Every mutation is an `INSERT ... ON CONFLICT DO UPDATE` upsert, so
//! repeated calls re-set the same flag without error and concurrent writers
//! for the same hardware id cannot lose updates to read-modify-write
//! interleavings. Preconditions (step ordering, hash rules) are checked by
//! the gate handlers before these run.

use crate::{db::DbPool, error::AppError, models::step_progress::StepProgress};

/// Mark step 1 complete, creating the progress record if absent.
pub async fn mark_step1(pool: &DbPool, hwid: &str) -> Result<StepProgress, AppError> {
    let progress = sqlx::query_as::<_, StepProgress>(
        r#"
        INSERT INTO step_progress (hardware_id, step1_completed, step1_at, last_update)
        VALUES ($1, TRUE, NOW(), NOW())
        ON CONFLICT (hardware_id) DO UPDATE
        SET step1_completed = TRUE,
            step1_at = NOW(),
            last_update = NOW()
        RETURNING *
        "#,
    )
    .bind(hwid)
    .fetch_one(pool)
    .await?;

    Ok(progress)
}

/// Mark step 2 complete and store the opaque verification hash.
pub async fn mark_step2(pool: &DbPool, hwid: &str, hash: &str) -> Result<StepProgress, AppError> {
    let progress = sqlx::query_as::<_, StepProgress>(
        r#"
        INSERT INTO step_progress (hardware_id, step1_completed, step2_completed, step2_hash, step2_at, last_update)
        VALUES ($1, TRUE, TRUE, $2, NOW(), NOW())
        ON CONFLICT (hardware_id) DO UPDATE
        SET step2_completed = TRUE,
            step2_hash = $2,
            step2_at = NOW(),
            last_update = NOW()
        RETURNING *
        "#,
    )
    .bind(hwid)
    .bind(hash)
    .fetch_one(pool)
    .await?;

    Ok(progress)
}

/// Mark step 3 complete and record the name of the issued key.
pub async fn mark_step3(
    pool: &DbPool,
    hwid: &str,
    key_name: &str,
) -> Result<StepProgress, AppError> {
    let progress = sqlx::query_as::<_, StepProgress>(
        r#"
        INSERT INTO step_progress (hardware_id, step1_completed, step2_completed, step3_completed, key_name, step3_at, last_update)
        VALUES ($1, TRUE, TRUE, TRUE, $2, NOW(), NOW())
        ON CONFLICT (hardware_id) DO UPDATE
        SET step3_completed = TRUE,
            key_name = $2,
            step3_at = NOW(),
            last_update = NOW()
        RETURNING *
        "#,
    )
    .bind(hwid)
    .bind(key_name)
    .fetch_one(pool)
    .await?;

    Ok(progress)
}

/// Fetch progress for a hardware id; a missing row behaves as all-false.
pub async fn get(pool: &DbPool, hwid: &str) -> Result<StepProgress, AppError> {
    let progress =
        sqlx::query_as::<_, StepProgress>("SELECT * FROM step_progress WHERE hardware_id = $1")
            .bind(hwid)
            .fetch_optional(pool)
            .await?;

    Ok(progress.unwrap_or_else(|| StepProgress::empty(hwid)))
}

//! Audit log - append-only event record.
//!
//! Events carry the hardware id and key name when applicable, the source IP
//! and optional per-event metadata. Core logic only ever appends here.

use crate::{db::DbPool, error::AppError, models::audit::EventType};

/// Append one event to the audit log.
pub async fn record(
    pool: &DbPool,
    event: EventType,
    hardware_id: Option<&str>,
    key_name: Option<&str>,
    source_ip: &str,
    metadata: Option<serde_json::Value>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (event_type, hardware_id, key_name, source_ip, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(event.as_str())
    .bind(hardware_id)
    .bind(key_name)
    .bind(source_ip)
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

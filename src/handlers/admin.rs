//! Admin surface HTTP handlers.
//!
//! Maintenance operations gated by a shared secret injected at startup:
//! - POST /create-default-key - create or fetch the well-known default key
//! - GET /admin/keys?adminKey=... - list every key record
//! - GET /admin/stats?adminKey=... - aggregate counters

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::{
    AppState,
    error::AppError,
    models::{
        admin::{AdminKeyQuery, AdminSecretBody},
        audit::EventType,
        key::KeyAdminView,
    },
    services::{audit_service, key_service},
};

use super::{AppJson, client_ip};

/// Compare a presented secret against the configured one.
///
/// Both sides are SHA-256 hashed and the fixed-width digests compared, so
/// response time does not depend on how much of the secret matched.
fn secret_matches(presented: &str, expected: &str) -> bool {
    Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}

/// Check an optional presented secret, rejecting absent or wrong values.
fn require_admin(presented: Option<&str>, expected: &str) -> Result<(), AppError> {
    match presented {
        Some(secret) if secret_matches(secret, expected) => Ok(()),
        _ => Err(AppError::AdminForbidden),
    }
}

/// Create the configured default key, or return it if it already exists.
///
/// # Endpoint
///
/// `POST /create-default-key` with body `{"adminSecret": "..."}`
///
/// Retry-safe by construction: an existing default key is fetched, not
/// recreated. Key names are unique and records are never deleted, so this
/// holds even after the default key expires: the expired record is returned
/// with `isExpired: true` and a fresh default cannot be minted under the
/// same name. Rotating the default means changing `DEFAULT_KEY_NAME`.
pub async fn create_default_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(body): AppJson<AdminSecretBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(body.admin_secret.as_deref(), &state.config.admin_secret)?;

    let name = state.config.default_key_name.clone();
    if let Some(existing) = key_service::find_by_name(&state.pool, &name).await? {
        return Ok(Json(json!({
            "success": true,
            "message": "Default key already exists",
            "key": KeyAdminView::from(existing)
        })));
    }

    let key = key_service::create_named(&state.pool, &name, state.config.key_duration_hours).await?;
    audit_service::record(
        &state.pool,
        EventType::KeyCreated,
        None,
        Some(&name),
        &client_ip(&headers),
        Some(json!({ "default": true })),
    )
    .await?;
    tracing::info!(key = %name, "default key created");

    Ok(Json(json!({
        "success": true,
        "message": "Default key created",
        "key": KeyAdminView::from(key)
    })))
}

/// List every key record, newest first.
///
/// # Endpoint
///
/// `GET /admin/keys?adminKey=...`
pub async fn list_keys(
    State(state): State<AppState>,
    Query(query): Query<AdminKeyQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(query.admin_key.as_deref(), &state.config.admin_secret)?;

    let keys: Vec<KeyAdminView> = key_service::list_all(&state.pool)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(json!({ "success": true, "keys": keys })))
}

/// Aggregate counters over keys, users and audit events.
///
/// # Endpoint
///
/// `GET /admin/stats?adminKey=...`
pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<AdminKeyQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(query.admin_key.as_deref(), &state.config.admin_secret)?;

    let stats = key_service::stats(&state.pool).await?;

    Ok(Json(json!({ "success": true, "stats": stats })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_secret_is_accepted() {
        assert!(secret_matches("hunter2-rotated", "hunter2-rotated"));
        assert!(require_admin(Some("s3cret"), "s3cret").is_ok());
    }

    #[test]
    fn wrong_or_missing_secret_is_forbidden() {
        assert!(!secret_matches("hunter2", "hunter3"));
        assert!(matches!(
            require_admin(Some("wrong"), "right"),
            Err(AppError::AdminForbidden)
        ));
        assert!(matches!(
            require_admin(None, "right"),
            Err(AppError::AdminForbidden)
        ));
    }

    #[test]
    fn prefix_of_secret_does_not_match() {
        assert!(!secret_matches("s3cre", "s3cret"));
        assert!(!secret_matches("s3cret-and-more", "s3cret"));
    }
}

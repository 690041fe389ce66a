//! Key HTTP handlers.
//!
//! This module implements the key-facing API endpoints:
//! - GET /key/{name}?hwid=... - fetch a key, binding it on first touch
//! - POST /create-key - create a named key
//! - GET /check-key/{name} - report key status without side effects

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState,
    error::AppError,
    models::{
        audit::EventType,
        key::{CreateKeyRequest, KeyAdminView, KeyGrantResponse, KeyStatusResponse},
    },
    services::{audit_service, key_service, key_service::BindOutcome},
    validation,
};

use super::{AppJson, client_ip};

/// Query string for the get-or-bind endpoint.
#[derive(Debug, Deserialize)]
pub struct BindQuery {
    pub hwid: Option<String>,
}

/// Fetch a key by name, binding it to the caller's hardware id on first touch.
///
/// # Endpoint
///
/// `GET /key/{name}?hwid=<hardware-id>`
///
/// # Rules (in order)
///
/// 1. `hwid` must be present (400 `MISSING_PARAMS`) and well-formed
///    (400 `INVALID_HWID`); the name must be well-formed (400 `INVALID_KEY_NAME`)
/// 2. The key must exist and be unexpired (404 `KEY_NOT_FOUND`); an `access`
///    event is logged either way, recording whether the key was found
/// 3. A key bound to a different hardware id is refused (403 `ALREADY_ASSIGNED`)
/// 4. An unbound key is claimed atomically; exactly one concurrent caller
///    wins, and an `assign` event is logged for the winner
///
/// Re-fetching with the bound hardware id is idempotent.
///
/// # Response (200)
///
/// ```json
/// {
///   "success": true,
///   "key": "DRK-9F2C41A807BD63E58A11F0C2D4B97E06",
///   "name": "drakness",
///   "expiresAt": "2025-06-02T10:00:00Z",
///   "status": "assigned",
///   "message": "Key assigned to this device"
/// }
/// ```
pub async fn get_or_bind(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<BindQuery>,
    headers: HeaderMap,
) -> Result<Json<KeyGrantResponse>, AppError> {
    let hwid = query
        .hwid
        .as_deref()
        .filter(|h| !h.is_empty())
        .ok_or(AppError::MissingParams)?;

    if !validation::valid_key_name(&name) {
        return Err(AppError::InvalidKeyName);
    }
    if !validation::valid_hardware_id(hwid) {
        return Err(AppError::InvalidHwid);
    }

    let ip = client_ip(&headers);

    // Access is logged before any outcome branch, with the lookup result
    let key = key_service::find_unexpired_by_name(&state.pool, &name).await?;
    audit_service::record(
        &state.pool,
        EventType::Access,
        Some(hwid),
        Some(&name),
        &ip,
        Some(json!({ "found": key.is_some() })),
    )
    .await?;

    if key.is_none() {
        return Err(AppError::KeyNotFound);
    }

    match key_service::bind_if_unassigned(&state.pool, &name, hwid).await? {
        BindOutcome::BoundNow(key) => {
            audit_service::record(
                &state.pool,
                EventType::Assign,
                Some(hwid),
                Some(&name),
                &ip,
                None,
            )
            .await?;
            tracing::info!(key = %name, "key bound to hardware id");
            Ok(Json(KeyGrantResponse::from_key(
                &key,
                "Key assigned to this device",
            )))
        }
        BindOutcome::AlreadyBoundToSame(key) => Ok(Json(KeyGrantResponse::from_key(
            &key,
            "Key already assigned to this device",
        ))),
        BindOutcome::BoundToOther => Err(AppError::AlreadyAssigned),
    }
}

/// Create a key with a caller-chosen name.
///
/// # Endpoint
///
/// `POST /create-key` with body `{"name": "...", "duration": 24}`
///
/// # Response
///
/// - **200**: the created key, still `available` and unassigned
/// - **400**: missing or malformed name
/// - **409 `NAME_TAKEN`**: a key with this name already exists
pub async fn create_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(request): AppJson<CreateKeyRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let name = request
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or(AppError::MissingParams)?;

    if !validation::valid_key_name(name) {
        return Err(AppError::InvalidKeyName);
    }

    let duration = request.duration.unwrap_or(state.config.key_duration_hours);
    let key = key_service::create_named(&state.pool, name, duration).await?;

    audit_service::record(
        &state.pool,
        EventType::KeyCreated,
        None,
        Some(name),
        &client_ip(&headers),
        None,
    )
    .await?;
    tracing::info!(key = %name, "named key created");

    Ok(Json(json!({
        "success": true,
        "message": "Key created",
        "key": KeyAdminView::from(key)
    })))
}

/// Report a key's status, including expired keys.
///
/// # Endpoint
///
/// `GET /check-key/{name}`
///
/// # Response
///
/// - **200**: `{valid, name, status, assignedTo, createdAt, expiresAt, isExpired}`
///   where `valid` is false once the key has expired
/// - **404**: `{"valid": false, "error": "KEY_NOT_FOUND"}`
///
/// Read-only; never mutates binding or progress state.
pub async fn check_key(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    match key_service::find_by_name(&state.pool, &name).await? {
        Some(key) => Ok(Json(KeyStatusResponse::from_key_at(&key, Utc::now())).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "valid": false, "error": "KEY_NOT_FOUND" })),
        )
            .into_response()),
    }
}

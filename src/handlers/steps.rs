//! Verification step HTTP handlers.
//!
//! This module implements the 3-step gating flow:
//! - POST /step1 - mark the entry step for a hardware id
//! - POST /step2 - record the external task hash (requires step 1)
//! - POST /step3 - verify the hash and issue the key (requires steps 1+2)
//! - GET /user-status/{hwid} - read-only progress report
//!
//! Steps 1 and 2 are upserts and safe to retry; step 3 returns the existing
//! bound key on repeat calls instead of minting a second one.

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde_json::json;

use crate::{
    AppState,
    error::AppError,
    models::{
        audit::EventType,
        key::KeyGrantResponse,
        step_progress::{
            BoundKeyInfo, HashStepRequest, Step1Request, StepAck, StepFlags, UserStatusResponse,
        },
    },
    services::{audit_service, key_service, step_service},
    validation,
};

use super::{AppJson, client_ip};

/// Pull a required field out of a request body.
fn require(field: &Option<String>) -> Result<&str, AppError> {
    field
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingParams)
}

/// Validate a hardware id from a request body.
fn require_hwid(field: &Option<String>) -> Result<&str, AppError> {
    let hwid = require(field)?;
    if !validation::valid_hardware_id(hwid) {
        return Err(AppError::InvalidHwid);
    }
    Ok(hwid)
}

/// Mark step 1 complete for a hardware id.
///
/// Idempotent: repeated calls re-set the same flag and timestamp.
pub async fn step1(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(request): AppJson<Step1Request>,
) -> Result<Json<StepAck>, AppError> {
    let hwid = require_hwid(&request.hwid)?;

    step_service::mark_step1(&state.pool, hwid).await?;
    audit_service::record(
        &state.pool,
        EventType::Step1Complete,
        Some(hwid),
        None,
        &client_ip(&headers),
        None,
    )
    .await?;

    Ok(Json(StepAck {
        success: true,
        message: "Step 1 completed".to_string(),
    }))
}

/// Record the external task hash for step 2.
///
/// # Rules
///
/// - step 1 must already be complete (403 `step1_not_done`)
/// - the hash must be non-empty and longer than 10 characters
///   (403 `invalid_hash`; placeholder check, see gate docs)
pub async fn step2(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(request): AppJson<HashStepRequest>,
) -> Result<Json<StepAck>, AppError> {
    let hwid = require_hwid(&request.hwid)?;
    let hash = require(&request.hash)?;

    let progress = step_service::get(&state.pool, hwid).await?;
    progress.gate_step2(hash)?;

    step_service::mark_step2(&state.pool, hwid, hash).await?;
    audit_service::record(
        &state.pool,
        EventType::Step2Complete,
        Some(hwid),
        None,
        &client_ip(&headers),
        None,
    )
    .await?;

    Ok(Json(StepAck {
        success: true,
        message: "Step 2 completed".to_string(),
    }))
}

/// Verify the hash and issue (or re-fetch) the caller's key.
///
/// # Rules
///
/// - steps 1 and 2 must both be complete (403 `bypass_detected`; the flags
///   are left untouched on detection)
/// - the supplied hash must equal the one stored at step 2 (403 `invalid_hash`)
/// - if an unexpired key is already bound to this hardware id it is returned
///   unchanged; otherwise a fresh key is created pre-bound to the caller
pub async fn step3(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(request): AppJson<HashStepRequest>,
) -> Result<Json<KeyGrantResponse>, AppError> {
    let hwid = require_hwid(&request.hwid)?;
    let hash = require(&request.hash)?;

    let progress = step_service::get(&state.pool, hwid).await?;
    progress.gate_step3(hash)?;

    // Retry-safe: an existing active binding short-circuits creation
    if let Some(existing) = key_service::find_active_by_hardware_id(&state.pool, hwid).await? {
        return Ok(Json(KeyGrantResponse::from_key(&existing, "already exists")));
    }

    let key =
        key_service::create_for_hardware_id(&state.pool, hwid, state.config.key_duration_hours)
            .await?;
    step_service::mark_step3(&state.pool, hwid, &key.name).await?;
    audit_service::record(
        &state.pool,
        EventType::KeyCreated,
        Some(hwid),
        Some(&key.name),
        &client_ip(&headers),
        Some(json!({ "self_service": true })),
    )
    .await?;
    tracing::info!(key = %key.name, "self-service key issued");

    Ok(Json(KeyGrantResponse::from_key(&key, "Key created")))
}

/// Read-only progress and key report for a hardware id.
///
/// # Endpoint
///
/// `GET /user-status/{hwid}`
///
/// # Response (200)
///
/// ```json
/// {
///   "success": true,
///   "steps": { "step1": true, "step2": true, "step3": false },
///   "hasValidKey": false,
///   "keyInfo": null
/// }
/// ```
///
/// A hardware id with no record reports all steps false.
pub async fn user_status(
    State(state): State<AppState>,
    Path(hwid): Path<String>,
) -> Result<Json<UserStatusResponse>, AppError> {
    if !validation::valid_hardware_id(&hwid) {
        return Err(AppError::InvalidHwid);
    }

    let progress = step_service::get(&state.pool, &hwid).await?;
    let active = key_service::find_active_by_hardware_id(&state.pool, &hwid).await?;

    Ok(Json(UserStatusResponse {
        success: true,
        steps: StepFlags::from(&progress),
        has_valid_key: active.is_some(),
        key_info: active.map(|key| BoundKeyInfo {
            key: key.value,
            expires_at: key.expires_at,
        }),
    }))
}

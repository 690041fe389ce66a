//! Admin surface request and response types.

use serde::{Deserialize, Serialize};

/// Body of the create-default-key request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSecretBody {
    pub admin_secret: Option<String>,
}

/// Query string carrying the admin secret for GET admin endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminKeyQuery {
    pub admin_key: Option<String>,
}

/// Aggregate counters returned by the admin stats endpoint.
///
/// `expired_keys` counts by `expires_at`, independently of status: an
/// assigned key past its expiry shows up in both counters.
#[derive(Debug, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStats {
    pub total_keys: i64,
    pub assigned_keys: i64,
    pub available_keys: i64,
    pub expired_keys: i64,
    pub total_users: i64,
    pub total_events: i64,
}

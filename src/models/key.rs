//! Key data models and API request/response types.
//!
//! This module defines:
//! - `Key`: database entity representing one issuable access key
//! - Request types for key creation and lookup
//! - Response types returned to clients (camelCase on the wire)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key status once bound. The transition is one-way: a key that has ever
/// been assigned stays `assigned`, even after it expires.
pub const STATUS_ASSIGNED: &str = "assigned";

/// Key status before the first successful bind.
pub const STATUS_AVAILABLE: &str = "available";

/// Represents a key record from the database.
///
/// # Database Table
///
/// Maps to the `keys` table. Each key:
/// - Has a unique human-chosen `name` (immutable after creation)
/// - Carries an opaque secret `value`, the actual deliverable
/// - May be bound to at most one hardware id, ever (`assigned_to` is
///   write-once outside administrative override)
///
/// # Expiry
///
/// Expiry is advisory and computed from `expires_at` at read time. Expired
/// keys remain queryable for status checks but are rejected for binding.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Key {
    /// Unique identifier for this row
    pub id: Uuid,

    /// Unique human-chosen name; collision at creation is a 409
    pub name: String,

    /// The opaque secret token string returned to the client
    pub value: String,

    /// `available` until first successful bind, then `assigned` permanently
    pub status: String,

    /// Hardware id this key is bound to, if any (write-once)
    pub assigned_to: Option<String>,

    /// When the binding happened, set exactly once
    pub assigned_at: Option<DateTime<Utc>>,

    /// Timestamp when the key was created
    pub created_at: DateTime<Utc>,

    /// Creation time plus the configured duration
    pub expires_at: DateTime<Utc>,
}

impl Key {
    /// Whether the key is expired at the given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the key is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Request body for creating a named key.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "drakness",
///   "duration": 48
/// }
/// ```
///
/// `duration` is in hours and defaults to the configured key lifetime (24h).
#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub name: Option<String>,

    /// Key lifetime in hours (defaults to configuration when omitted)
    pub duration: Option<i64>,
}

/// Successful key delivery, used by get-or-bind and step 3.
///
/// # JSON Example
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
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyGrantResponse {
    pub success: bool,
    pub key: String,
    pub name: String,
    pub expires_at: DateTime<Utc>,
    pub status: String,
    pub message: String,
}

impl KeyGrantResponse {
    /// Build a grant response from a key record and a human message.
    pub fn from_key(key: &Key, message: impl Into<String>) -> Self {
        Self {
            success: true,
            key: key.value.clone(),
            name: key.name.clone(),
            expires_at: key.expires_at,
            status: key.status.clone(),
            message: message.into(),
        }
    }
}

/// Response body for the check-key endpoint.
///
/// `valid` is true iff the key exists and is unexpired; an expired key still
/// reports its details with `isExpired: true`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatusResponse {
    pub valid: bool,
    pub name: String,
    pub status: String,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
}

impl KeyStatusResponse {
    pub fn from_key_at(key: &Key, now: DateTime<Utc>) -> Self {
        let is_expired = key.is_expired_at(now);
        Self {
            valid: !is_expired,
            name: key.name.clone(),
            status: key.status.clone(),
            assigned_to: key.assigned_to.clone(),
            created_at: key.created_at,
            expires_at: key.expires_at,
            is_expired,
        }
    }
}

/// Full key view for administrative listings and creation responses.
///
/// Unlike client responses this includes the binding details; it is only
/// returned behind the admin secret or to the creator of the key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyAdminView {
    pub name: String,
    pub value: String,
    pub status: String,
    pub assigned_to: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
}

impl From<Key> for KeyAdminView {
    fn from(key: Key) -> Self {
        let is_expired = key.is_expired();
        Self {
            name: key.name,
            value: key.value,
            status: key.status,
            assigned_to: key.assigned_to,
            assigned_at: key.assigned_at,
            created_at: key.created_at,
            expires_at: key.expires_at,
            is_expired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_key(expires_at: DateTime<Utc>) -> Key {
        Key {
            id: Uuid::new_v4(),
            name: "drakness".to_string(),
            value: "DRK-00FF00FF00FF00FF00FF00FF00FF00FF".to_string(),
            status: STATUS_AVAILABLE.to_string(),
            assigned_to: None,
            assigned_at: None,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
            expires_at,
        }
    }

    #[test]
    fn expiry_is_computed_from_expires_at() {
        let expiry = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        let key = sample_key(expiry);

        assert!(!key.is_expired_at(expiry - chrono::Duration::seconds(1)));
        // Expiry is strictly "now > expires_at"
        assert!(!key.is_expired_at(expiry));
        assert!(key.is_expired_at(expiry + chrono::Duration::seconds(1)));
    }

    #[test]
    fn status_response_reports_expired_keys_as_invalid() {
        let expiry = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        let key = sample_key(expiry);

        let fresh = KeyStatusResponse::from_key_at(&key, expiry - chrono::Duration::hours(1));
        assert!(fresh.valid);
        assert!(!fresh.is_expired);

        let stale = KeyStatusResponse::from_key_at(&key, expiry + chrono::Duration::hours(1));
        assert!(!stale.valid);
        assert!(stale.is_expired);
        // Expired keys still report their details
        assert_eq!(stale.name, "drakness");
    }

    #[test]
    fn admin_view_flags_expired_keys() {
        // An expired key fetched by the admin surface (e.g. a stale default
        // key) is still returned, with the expiry made explicit.
        let long_gone = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let view = KeyAdminView::from(sample_key(long_gone));
        assert!(view.is_expired);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["isExpired"], serde_json::Value::Bool(true));
        assert_eq!(json["name"], "drakness");
    }

    #[test]
    fn wire_fields_are_camel_case() {
        let expiry = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        let key = sample_key(expiry);
        let grant = KeyGrantResponse::from_key(&key, "ok");

        let json = serde_json::to_value(&grant).unwrap();
        assert!(json.get("expiresAt").is_some());
        assert!(json.get("expires_at").is_none());

        let status = serde_json::to_value(KeyStatusResponse::from_key_at(&key, expiry)).unwrap();
        assert!(status.get("assignedTo").is_some());
        assert!(status.get("isExpired").is_some());
    }
}

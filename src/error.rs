//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and a stable error code
/// the client widget branches on.
///
/// # Error Categories
///
/// - **Validation errors**: malformed hardware id / key name / body → 400
/// - **Conflict**: duplicate key name → 409
/// - **Not found**: unknown or expired key → 404
/// - **Forbidden**: wrong binding, incomplete steps, hash mismatch, bad admin secret → 403
/// - **Internal**: any sqlx::Error from store operations → 500
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A required parameter was absent from the request.
    #[error("Missing required parameters")]
    MissingParams,

    /// The request body was not valid JSON (or carried the wrong content type).
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// Requested key duration is outside the accepted range.
    #[error("Key duration must be between 1 and 8760 hours")]
    InvalidDuration,

    /// Hardware id failed the format check (charset or length).
    #[error("Hardware id must be 8-50 characters of letters, digits, '_' or '-'")]
    InvalidHwid,

    /// Key name failed the format check.
    #[error("Key name may only contain letters, digits and '-'")]
    InvalidKeyName,

    /// No key with that name exists, or it has expired.
    #[error("Key not found or expired")]
    KeyNotFound,

    /// The key is permanently bound to a different hardware id.
    #[error("Key is already assigned to another device")]
    AlreadyAssigned,

    /// A key with the requested name already exists.
    #[error("A key with this name already exists")]
    NameTaken,

    /// Step 2 was attempted before step 1 completed.
    #[error("Step 1 has not been completed")]
    Step1NotDone,

    /// The supplied verification hash is malformed or does not match the
    /// hash stored at step 2.
    #[error("Verification hash is invalid")]
    InvalidHash,

    /// Step 3 was attempted without completing the earlier steps.
    ///
    /// Reported but does not reset progress flags.
    #[error("Verification bypass detected")]
    BypassDetected,

    /// Admin secret missing or wrong.
    #[error("Invalid admin secret")]
    AdminForbidden,
}

impl AppError {
    /// HTTP status and stable error code for this error.
    ///
    /// Key-endpoint codes are SCREAMING_SNAKE, step-endpoint codes are
    /// lower_snake; both are part of the wire contract the widget matches on.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::MissingParams => (StatusCode::BAD_REQUEST, "MISSING_PARAMS"),
            AppError::MalformedBody(_) => (StatusCode::BAD_REQUEST, "MALFORMED_BODY"),
            AppError::InvalidHwid => (StatusCode::BAD_REQUEST, "INVALID_HWID"),
            AppError::InvalidKeyName => (StatusCode::BAD_REQUEST, "INVALID_KEY_NAME"),
            AppError::InvalidDuration => (StatusCode::BAD_REQUEST, "INVALID_DURATION"),
            AppError::KeyNotFound => (StatusCode::NOT_FOUND, "KEY_NOT_FOUND"),
            AppError::AlreadyAssigned => (StatusCode::FORBIDDEN, "ALREADY_ASSIGNED"),
            AppError::NameTaken => (StatusCode::CONFLICT, "NAME_TAKEN"),
            AppError::Step1NotDone => (StatusCode::FORBIDDEN, "step1_not_done"),
            AppError::InvalidHash => (StatusCode::FORBIDDEN, "invalid_hash"),
            AppError::BypassDetected => (StatusCode::FORBIDDEN, "bypass_detected"),
            AppError::AdminForbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error"),
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "success": false,
///   "error": "KEY_NOT_FOUND",
///   "code": "KEY_NOT_FOUND",
///   "message": "Key not found or expired"
/// }
/// ```
///
/// The code is carried in both `error` and `code` so clients written against
/// either field keep working. Store failures are logged server-side and
/// surfaced with a short generic message only.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Database(err) => {
                tracing::error!("store failure: {err}");
                "server error: store operation failed".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": code,
            "code": code,
            "message": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_requests() {
        assert_eq!(
            AppError::MissingParams.status_and_code(),
            (StatusCode::BAD_REQUEST, "MISSING_PARAMS")
        );
        assert_eq!(
            AppError::InvalidHwid.status_and_code(),
            (StatusCode::BAD_REQUEST, "INVALID_HWID")
        );
        assert_eq!(
            AppError::InvalidKeyName.status_and_code(),
            (StatusCode::BAD_REQUEST, "INVALID_KEY_NAME")
        );
        assert_eq!(
            AppError::InvalidDuration.status_and_code(),
            (StatusCode::BAD_REQUEST, "INVALID_DURATION")
        );
        assert_eq!(
            AppError::MalformedBody("expected value".to_string()).status_and_code(),
            (StatusCode::BAD_REQUEST, "MALFORMED_BODY")
        );
    }

    #[test]
    fn gate_violations_are_forbidden() {
        for (err, code) in [
            (AppError::AlreadyAssigned, "ALREADY_ASSIGNED"),
            (AppError::Step1NotDone, "step1_not_done"),
            (AppError::InvalidHash, "invalid_hash"),
            (AppError::BypassDetected, "bypass_detected"),
            (AppError::AdminForbidden, "forbidden"),
        ] {
            assert_eq!(err.status_and_code(), (StatusCode::FORBIDDEN, code));
        }
    }

    #[test]
    fn duplicate_name_is_conflict() {
        assert_eq!(
            AppError::NameTaken.status_and_code(),
            (StatusCode::CONFLICT, "NAME_TAKEN")
        );
    }

    #[test]
    fn unknown_key_is_not_found() {
        assert_eq!(
            AppError::KeyNotFound.status_and_code(),
            (StatusCode::NOT_FOUND, "KEY_NOT_FOUND")
        );
    }

    #[test]
    fn store_failures_are_internal_errors() {
        let err = AppError::Database(sqlx::Error::RowNotFound);
        assert_eq!(
            err.status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
        );
    }
}

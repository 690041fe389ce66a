//! HTTP request handlers (route handlers).
//!
//! Each handler validates input, applies the gate rules through the service
//! layer, appends audit events and returns JSON. Handlers hold no state of
//! their own; everything flows through the shared pool and config.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;

use crate::error::AppError;

/// Admin surface endpoints
pub mod admin;
/// Liveness/readiness endpoint
pub mod health;
/// Key retrieval, creation and status endpoints
pub mod keys;
/// Verification step and user status endpoints
pub mod steps;

/// Fallback for unmatched routes.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" })))
}

/// JSON body extractor whose rejection is the standard error envelope.
///
/// Axum's plain `Json` answers malformed bodies and wrong content types with
/// a text/plain rejection before the handler runs; every response on this
/// surface must be JSON, so body extraction goes through this wrapper and
/// failures surface as a 400 `MALFORMED_BODY` envelope instead.
#[derive(Debug)]
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(AppError::MalformedBody(rejection.body_text())),
        }
    }
}

/// Best-effort client IP for audit events.
///
/// Takes the first hop of `X-Forwarded-For` when present (the service is
/// expected to sit behind a proxy), otherwise reports "unknown". Used for
/// telemetry only, never for authorization.
pub(crate) fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn missing_header_reports_unknown() {
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn empty_header_reports_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));
        assert_eq!(client_ip(&headers), "unknown");
    }

    fn post_json(content_type: Option<&str>, body: &str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/step1");
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        builder.body(axum::body::Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn malformed_body_becomes_json_envelope_error() {
        let req = post_json(Some("application/json"), "{not json");
        let err = AppJson::<crate::models::step_progress::Step1Request>::from_request(req, &())
            .await
            .unwrap_err();
        assert_eq!(
            err.status_and_code(),
            (StatusCode::BAD_REQUEST, "MALFORMED_BODY")
        );
    }

    #[tokio::test]
    async fn missing_content_type_becomes_json_envelope_error() {
        let req = post_json(None, r#"{"hwid":"HWID-TEST-0001"}"#);
        let err = AppJson::<crate::models::step_progress::Step1Request>::from_request(req, &())
            .await
            .unwrap_err();
        assert_eq!(
            err.status_and_code(),
            (StatusCode::BAD_REQUEST, "MALFORMED_BODY")
        );
    }

    #[tokio::test]
    async fn well_formed_body_extracts() {
        let req = post_json(Some("application/json"), r#"{"hwid":"HWID-TEST-0001"}"#);
        let AppJson(body) =
            AppJson::<crate::models::step_progress::Step1Request>::from_request(req, &())
                .await
                .unwrap();
        assert_eq!(body.hwid.as_deref(), Some("HWID-TEST-0001"));
    }
}

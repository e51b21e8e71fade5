//! Request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) and echo it on the response
//! - Extract appraisal text from a raw or JSON body
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Any content type other than JSON is treated as raw text

use axum::http::{header, HeaderMap, HeaderName};
use serde::Deserialize;
use thiserror::Error;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Assign an `x-request-id` to requests that arrive without one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Copy the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// The request ID assigned to a request, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Errors extracting appraisal text.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("body is not valid UTF-8")]
    NotUtf8,

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct JsonAppraisal {
    raw_textarea: String,
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.split(';').next().unwrap_or("").trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// Text to classify: `raw_textarea` of a JSON body, or the body itself.
pub fn appraisal_text(headers: &HeaderMap, body: &[u8]) -> Result<String, BodyError> {
    if is_json(headers) {
        let parsed: JsonAppraisal = serde_json::from_slice(body)?;
        return Ok(parsed.raw_textarea);
    }
    std::str::from_utf8(body)
        .map(str::to_string)
        .map_err(|_| BodyError::NotUtf8)
}

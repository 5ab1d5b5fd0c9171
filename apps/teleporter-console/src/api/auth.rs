//! # Authentication Module
//!
//! Bearer API key check for the console service. This protects the transport
//! between the console clients and the service; it is not operator identity.
//!
//! When a key is configured, every route except `/health` requires:
//! ```text
//! Authorization: Bearer <api-key>
//! ```
//! A raw `<api-key>` header value is accepted too.

use super::types::ErrorResponse;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Expected key shared by all requests.
pub type ApiKey = Arc<str>;

/// Compare the provided key with the expected one in constant time.
///
/// Both sides are compared over the longer length so the loop count does not
/// depend on where they first differ.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let len = provided.len().max(expected.len());
    let pad = |bytes: &[u8]| {
        let mut out = vec![0u8; len];
        out[..bytes.len()].copy_from_slice(bytes);
        out
    };
    let same_bytes: bool = pad(provided).ct_eq(&pad(expected)).into();
    same_bytes && provided.len() == expected.len()
}

fn unauthorized(reason: &'static str) -> Response {
    tracing::warn!(event = "auth_failure", reason, "request rejected");
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::message("Unauthorized")),
    )
        .into_response()
}

/// API key middleware. Only installed when a key is configured.
pub async fn api_key_auth_middleware(
    State(expected): State<ApiKey>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let Some(value) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return unauthorized("missing_authorization_header");
    };

    let provided = value.strip_prefix("Bearer ").unwrap_or(value);
    if keys_match(provided.as_bytes(), expected.as_bytes()) {
        next.run(request).await
    } else {
        unauthorized("invalid_api_key")
    }
}

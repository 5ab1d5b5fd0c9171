//! # API Request/Response Types
//!
//! JSON structures of the console service, plus the error response mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use teleporter_core::primitives::DEFAULT_RANGE_LIMIT;
use teleporter_core::{ConsoleError, EntityKind, FieldSchema, KeyedValue, SchemaVersion};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// KEY SPACE
// =============================================================================

/// `?key=` of single-entry endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryQuery {
    pub key: String,
}

/// `?prefix=&offset=&limit=` of the range endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeQuery {
    #[serde(default = "root_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn root_prefix() -> String {
    "/".to_string()
}

const fn default_limit() -> usize {
    DEFAULT_RANGE_LIMIT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeResponse {
    pub entries: Vec<KeyedValue<Value>>,
}

/// Unconditional upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutRequest {
    pub key: String,
    pub value: Value,
}

/// Compare-and-set upsert. `expected_version: null` means "must not exist".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomicPutRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub key: String,
}

/// A freshly allocated entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceResponse {
    pub id: u64,
}

// =============================================================================
// SCHEMAS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub kind: EntityKind,
    pub version: SchemaVersion,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaQuery {
    #[serde(default)]
    pub category: Option<String>,
}

/// A fully resolved form schema. Serialize only: schemas are built in code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaResponse {
    pub kind: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub version: SchemaVersion,
    pub fields: FieldSchema,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body of every failed request.
///
/// `key` and the version fields are set for not-found and conflict errors so
/// clients can rebuild the typed error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expected_version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub actual_version: Option<u64>,
}

impl ErrorResponse {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            key: None,
            expected_version: None,
            actual_version: None,
        }
    }
}

/// `ConsoleError` as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub ConsoleError);

impl From<ConsoleError> for ApiError {
    fn from(err: ConsoleError) -> Self {
        Self(err)
    }
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ConsoleError::NotFound(_) => StatusCode::NOT_FOUND,
            ConsoleError::Conflict { .. } => StatusCode::CONFLICT,
            ConsoleError::RemoteFailure(_) | ConsoleError::IoError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ConsoleError::UnknownCategory(_)
            | ConsoleError::MissingCategory(_)
            | ConsoleError::UnknownKind(_)
            | ConsoleError::UnknownSchemaVersion(_)
            | ConsoleError::ValidationFailed(_)
            | ConsoleError::InvalidKey(_)
            | ConsoleError::DuplicateField(_)
            | ConsoleError::UnresolvedGroup(_)
            | ConsoleError::ReadOnlyField(_)
            | ConsoleError::UnknownField(_)
            | ConsoleError::SerializationError(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> ErrorResponse {
        let mut body = ErrorResponse::message(self.0.to_string());
        match &self.0 {
            ConsoleError::NotFound(key) => body.key = Some(key.clone()),
            ConsoleError::Conflict {
                key,
                expected,
                actual,
            } => {
                body.key = Some(key.clone());
                body.expected_version = *expected;
                body.actual_version = *actual;
            }
            _ => {}
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError(ConsoleError::NotFound("/a/b".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(ConsoleError::UnknownCategory("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(ConsoleError::IoError("disk".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn conflict_body_carries_versions() {
        let body = ApiError(ConsoleError::Conflict {
            key: "/task/ns1/t1".into(),
            expected: Some(1),
            actual: Some(3),
        })
        .body();
        assert_eq!(body.key.as_deref(), Some("/task/ns1/t1"));
        assert_eq!(body.expected_version, Some(1));
        assert_eq!(body.actual_version, Some(3));
    }

    #[test]
    fn range_query_defaults() {
        let query: RangeQuery = serde_json::from_str("{}").expect("parse");
        assert_eq!(query.prefix, "/");
        assert_eq!(query.offset, 0);
        assert_eq!(query.limit, DEFAULT_RANGE_LIMIT);
    }
}

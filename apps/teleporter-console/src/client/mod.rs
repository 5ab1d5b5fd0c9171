//! # Key Space Clients
//!
//! Typed access to the console service's two spaces.
//!
//! - [`KvTransport`]: the raw KV operations, implemented over HTTP
//!   ([`HttpTransport`]) and in-process ([`LocalTransport`])
//! - [`ConfigStore`]: CRUD and range over one entity kind's config entries
//! - [`RuntimeStore`]: read-mostly access to runtime overlays
//!
//! Stores are stateless: no caching, no retries. Every call reaches the
//! service.

mod config_store;
mod entity;
mod http;
mod local;
mod runtime;

pub use config_store::ConfigStore;
pub use entity::{Address, Entity, Sink, Stream, Task, Variable};
pub use http::HttpTransport;
pub use local::LocalTransport;
pub use runtime::{RuntimeLookup, RuntimeStore};

use serde_json::Value;
use std::future::Future;
use teleporter_core::{ConsoleError, KeyedValue, Space};
use thiserror::Error;

// =============================================================================
// TRANSPORT
// =============================================================================

/// The KV operations the stores are written against.
///
/// Implementations must be cheap to clone; stores and controllers clone the
/// transport instead of sharing references.
pub trait KvTransport: Clone + Send + Sync + 'static {
    fn get(
        &self,
        space: Space,
        key: &str,
    ) -> impl Future<Output = Result<Option<KeyedValue<Value>>, ConsoleError>> + Send;

    fn range(
        &self,
        space: Space,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<KeyedValue<Value>>, ConsoleError>> + Send;

    fn put(
        &self,
        space: Space,
        key: &str,
        value: Value,
    ) -> impl Future<Output = Result<KeyedValue<Value>, ConsoleError>> + Send;

    fn put_if_version(
        &self,
        space: Space,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> impl Future<Output = Result<KeyedValue<Value>, ConsoleError>> + Send;

    /// `Ok(false)` when the key was already absent.
    fn remove(
        &self,
        space: Space,
        key: &str,
    ) -> impl Future<Output = Result<bool, ConsoleError>> + Send;

    /// Ask the processing engine to reload a config key.
    fn refresh(&self, key: &str) -> impl Future<Output = Result<(), ConsoleError>> + Send;

    /// Allocate a new entity id from the service's sequence.
    fn next_id(&self) -> impl Future<Output = Result<u64, ConsoleError>> + Send;
}

// =============================================================================
// CLIENT ERRORS
// =============================================================================

/// Errors from the HTTP client layer.
#[derive(Debug, Error, PartialEq)]
pub enum ClientError {
    #[error("Cannot connect to console service at {0}")]
    ConnectionFailed(String),

    #[error("Unauthorized: invalid or missing API key")]
    Unauthorized,

    #[error("Rate limited: too many requests")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Version conflict on {key}: expected {expected:?}, found {actual:?}")]
    Conflict {
        key: String,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    /// Other 4xx response.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<ClientError> for ConsoleError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(key) => Self::NotFound(key),
            ClientError::Conflict {
                key,
                expected,
                actual,
            } => Self::Conflict {
                key,
                expected,
                actual,
            },
            other => Self::RemoteFailure(other.to_string()),
        }
    }
}

//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the console model:
//! - Entity kinds and the ordered entity value (`EntityKind`, `EntityValue`)
//! - Store read results (`KeyedValue`)
//! - Runtime overlay records (`RuntimeRecord`)
//! - Validation findings (`FieldIssue`)
//! - Error types (`ConsoleError`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// ENTITY VALUE
// =============================================================================

/// A plain entity value as stored in the key space.
///
/// Backed by `serde_json::Map` with `preserve_order`, so open-ended groups
/// like `arguments` keep their insertion order for display.
pub type EntityValue = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// ENTITY KIND
// =============================================================================

/// The five configuration entity kinds managed by the console.
///
/// The lowercase name doubles as the root segment of every key path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Address,
    Task,
    Stream,
    Sink,
    Variable,
}

impl EntityKind {
    /// All kinds in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Address,
        Self::Task,
        Self::Stream,
        Self::Sink,
        Self::Variable,
    ];

    /// Root path segment for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Task => "task",
            Self::Stream => "stream",
            Self::Sink => "sink",
            Self::Variable => "variable",
        }
    }

    /// Number of parent key segments between the namespace and the entity key.
    ///
    /// Streams live under a task, sinks under a task and a stream.
    #[must_use]
    pub const fn parent_depth(self) -> usize {
        match self {
            Self::Address | Self::Task | Self::Variable => 0,
            Self::Stream => 1,
            Self::Sink => 2,
        }
    }

    /// Whether the `client` block of this kind is selected by a category.
    #[must_use]
    pub const fn is_categorized(self) -> bool {
        matches!(self, Self::Address | Self::Sink)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConsoleError::UnknownKind(s.to_string()))
    }
}

// =============================================================================
// KEYED VALUE
// =============================================================================

/// A store read result: the full hierarchical key, the value, and the
/// store-assigned version and write timestamp.
///
/// `version` and `timestamp` are informational for display; conflict
/// resolution belongs to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedValue<V> {
    pub key: String,
    pub value: V,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub timestamp: i64,
}

impl<V> KeyedValue<V> {
    /// Create a keyed value.
    pub fn new(key: impl Into<String>, value: V, version: u64, timestamp: i64) -> Self {
        Self {
            key: key.into(),
            value,
            version,
            timestamp,
        }
    }

    /// Convert the payload, keeping key and version metadata.
    pub fn try_map<U, E>(self, f: impl FnOnce(V) -> Result<U, E>) -> Result<KeyedValue<U>, E> {
        Ok(KeyedValue {
            key: self.key,
            value: f(self.value)?,
            version: self.version,
            timestamp: self.timestamp,
        })
    }
}

impl KeyedValue<serde_json::Value> {
    /// Interpret the raw payload as an entity value (JSON object).
    pub fn into_entity(self) -> Result<KeyedValue<EntityValue>, ConsoleError> {
        let key = self.key.clone();
        self.try_map(|value| match value {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(ConsoleError::SerializationError(format!(
                "Entry {} is not an object: {}",
                key, other
            ))),
        })
    }

    /// Interpret the raw payload as a runtime record.
    pub fn into_runtime(self) -> Result<KeyedValue<RuntimeRecord>, ConsoleError> {
        self.try_map(|value| {
            serde_json::from_value(value)
                .map_err(|e| ConsoleError::SerializationError(e.to_string()))
        })
    }
}

// =============================================================================
// RUNTIME RECORD
// =============================================================================

/// Live operational state reported by the processing engine.
///
/// Never the source of truth for configuration. Fields beyond the owner
/// keys and timestamp (offsets, counters) are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuntimeRecord {
    /// Worker identifiers currently holding the entity.
    #[serde(rename = "keys", alias = "ownerKeys", default)]
    pub owner_keys: Vec<String>,
    /// Engine-side report time in milliseconds.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(flatten)]
    pub extra: EntityValue,
}

// =============================================================================
// FIELD ISSUE
// =============================================================================

/// What is wrong with a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A required field has no value.
    Required,
    /// A number field holds text that does not parse as a number.
    NotANumber,
}

/// A validation finding for one field, addressed by its path of keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    /// Keys from the form root to the field, e.g. `["client", "kuduMaster"]`.
    pub path: Vec<String>,
    pub kind: IssueKind,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.join(" / ");
        match self.kind {
            IssueKind::Required => write!(f, "{path}: required"),
            IssueKind::NotANumber => write!(f, "{path}: not a number"),
        }
    }
}

fn format_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the console model.
///
/// - No silent failures: every variant reaches the initiating caller
/// - The only swallowed failure in the system is runtime-record cleanup,
///   and that happens in the app layer, not here
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConsoleError {
    /// No schema is registered for this category.
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// A categorized entity kind was used without a category.
    #[error("Category required for {0}")]
    MissingCategory(EntityKind),

    /// Not one of the five entity kinds.
    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    /// Unknown schema version identifier.
    #[error("Unknown schema version: {0}")]
    UnknownSchemaVersion(String),

    /// Point lookup miss.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Compare-and-set write rejected because the stored version moved.
    #[error("Version conflict on {key}: expected {expected:?}, found {actual:?}")]
    Conflict {
        key: String,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    /// The form has empty required fields or malformed numbers.
    #[error("Validation failed: {}", format_issues(.0))]
    ValidationFailed(Vec<FieldIssue>),

    /// Network or store failure reported by the remote service.
    #[error("Remote failure: {0}")]
    RemoteFailure(String),

    /// A key or key segment violates the key space rules.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A schema declares the same key twice.
    #[error("Duplicate field key in schema: {0}")]
    DuplicateField(String),

    /// A category-resolved group was materialized before being bound.
    #[error("Group field {0} has no resolved schema")]
    UnresolvedGroup(String),

    /// Attempt to edit a readonly field.
    #[error("Field is readonly: {0}")]
    ReadOnlyField(String),

    /// The form has no field with this key, or the field has another kind.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred in the storage engine.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

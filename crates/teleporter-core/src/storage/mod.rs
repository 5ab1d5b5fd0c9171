//! # Key Space Storage
//!
//! The reference implementation of the strongly-consistent KV service the
//! console is written against. Two parallel spaces share one key layout:
//! `config` holds entities, `runtime` holds engine-reported overlays.
//!
//! ## Backends
//!
//! - `MemoryStore`: `BTreeMap` per space (tests, ephemeral service)
//! - `RedbStore`: disk-backed redb database, one table per space
//!
//! Each write bumps the key's version (starting at 1) and stamps the write
//! time. Ordering is lexicographic by key.
//!
//! A removed key leaves a tombstone holding its last version, so a key that
//! is deleted and written again continues the version sequence instead of
//! restarting at 1. A version check taken before the delete can never match
//! the re-created entry.
//!
//! The store also hands out entity ids from a single sequence that never
//! repeats, even across deletes and restarts.

pub mod memory;
pub mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::notify::now_millis;
use crate::primitives::{MAX_RANGE_LIMIT, MAX_VALUE_BYTES};
use crate::{ConsoleError, KeyedValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

// =============================================================================
// SPACE
// =============================================================================

/// Which of the two parallel namespaces an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    Config,
    Runtime,
}

impl Space {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Runtime => "runtime",
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Space {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "config" => Ok(Self::Config),
            "runtime" => Ok(Self::Runtime),
            other => Err(ConsoleError::InvalidKey(format!("unknown space '{}'", other))),
        }
    }
}

// =============================================================================
// KVSTORE TRAIT
// =============================================================================

/// The KV operations the console relies on.
///
/// Implementations validate keys on write and enforce range bounds; callers
/// never see a partially applied write.
pub trait KvStore {
    /// Point lookup. `Ok(None)` when absent.
    fn get(&self, space: Space, key: &str) -> Result<Option<KeyedValue<Value>>, ConsoleError>;

    /// Entries at or below `prefix` (segment boundary), lexicographic,
    /// skipping `offset`, at most `limit` (capped at `MAX_RANGE_LIMIT`).
    fn range(
        &self,
        space: Space,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<KeyedValue<Value>>, ConsoleError>;

    /// Unconditional upsert. Last writer wins.
    fn put(&mut self, space: Space, key: &str, value: Value)
    -> Result<KeyedValue<Value>, ConsoleError>;

    /// Upsert only if the stored version equals `expected` (`None` = absent).
    fn put_if_version(
        &mut self,
        space: Space,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> Result<KeyedValue<Value>, ConsoleError>;

    /// Delete a key. Returns whether it existed; absent keys are not an error.
    fn remove(&mut self, space: Space, key: &str) -> Result<bool, ConsoleError>;

    /// Number of entries in a space.
    fn len(&self, space: Space) -> Result<usize, ConsoleError>;

    /// Allocate the next entity id. Ids start at 1 and are never reused.
    fn next_id(&mut self) -> Result<u64, ConsoleError>;
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Check the encoded size of a value and return its JSON text.
pub(crate) fn encode_value(value: &Value) -> Result<String, ConsoleError> {
    let json =
        serde_json::to_string(value).map_err(|e| ConsoleError::SerializationError(e.to_string()))?;
    if json.len() > MAX_VALUE_BYTES {
        return Err(ConsoleError::SerializationError(format!(
            "Value length {} exceeds maximum {} bytes",
            json.len(),
            MAX_VALUE_BYTES
        )));
    }
    Ok(json)
}

/// Version that follows `previous`, the live version or the tombstone of
/// a removed key.
pub(crate) fn next_version(previous: Option<u64>) -> u64 {
    previous.map_or(1, |v| v.saturating_add(1))
}

pub(crate) fn write_timestamp() -> i64 {
    now_millis()
}

pub(crate) fn effective_limit(limit: usize) -> usize {
    limit.min(MAX_RANGE_LIMIT)
}

pub(crate) fn check_expected(
    key: &str,
    expected: Option<u64>,
    actual: Option<u64>,
) -> Result<(), ConsoleError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ConsoleError::Conflict {
            key: key.to_string(),
            expected,
            actual,
        })
    }
}

// =============================================================================
// KEYSPACE (backend selection)
// =============================================================================

/// Storage backend of the console service.
#[derive(Debug)]
pub enum Keyspace {
    /// Volatile in-memory store.
    InMemory(MemoryStore),
    /// Disk-backed redb store.
    Persistent(RedbStore),
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl Keyspace {
    /// Empty in-memory key space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or create a redb-backed key space at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, ConsoleError> {
        Ok(Self::Persistent(RedbStore::open(path)?))
    }

    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    fn store(&self) -> &dyn KvStore {
        match self {
            Self::InMemory(s) => s,
            Self::Persistent(s) => s,
        }
    }

    fn store_mut(&mut self) -> &mut dyn KvStore {
        match self {
            Self::InMemory(s) => s,
            Self::Persistent(s) => s,
        }
    }
}

impl KvStore for Keyspace {
    fn get(&self, space: Space, key: &str) -> Result<Option<KeyedValue<Value>>, ConsoleError> {
        self.store().get(space, key)
    }

    fn range(
        &self,
        space: Space,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<KeyedValue<Value>>, ConsoleError> {
        self.store().range(space, prefix, offset, limit)
    }

    fn put(
        &mut self,
        space: Space,
        key: &str,
        value: Value,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        self.store_mut().put(space, key, value)
    }

    fn put_if_version(
        &mut self,
        space: Space,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        self.store_mut().put_if_version(space, key, value, expected)
    }

    fn remove(&mut self, space: Space, key: &str) -> Result<bool, ConsoleError> {
        self.store_mut().remove(space, key)
    }

    fn len(&self, space: Space) -> Result<usize, ConsoleError> {
        self.store().len(space)
    }

    fn next_id(&mut self) -> Result<u64, ConsoleError> {
        self.store_mut().next_id()
    }
}

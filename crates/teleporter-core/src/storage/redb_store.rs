//! # redb-backed Key Space
//!
//! A disk-backed key space using the redb embedded database. Each space is
//! one table keyed by the full hierarchical path; values are postcard-encoded
//! [`StoredEntry`] records carrying version, write time and the JSON text of
//! the value.
//!
//! Every write runs in its own transaction, so a conditional put reads and
//! replaces the version atomically. Tombstones of removed keys and the
//! entity id sequence live in their own tables and survive a reopen.

use super::{
    KvStore, Space, check_expected, effective_limit, encode_value, next_version, write_timestamp,
};
use crate::keyspace::{covers, normalize_prefix, validate_key};
use crate::{ConsoleError, KeyedValue};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Table for configuration entities: path -> serialized StoredEntry.
const CONFIG: TableDefinition<&str, &[u8]> = TableDefinition::new("config");

/// Table for runtime overlays: path -> serialized StoredEntry.
const RUNTIME: TableDefinition<&str, &[u8]> = TableDefinition::new("runtime");

/// Last version of removed config keys: path -> version.
const CONFIG_TOMBSTONES: TableDefinition<&str, u64> = TableDefinition::new("config_tombstones");

/// Last version of removed runtime keys: path -> version.
const RUNTIME_TOMBSTONES: TableDefinition<&str, u64> = TableDefinition::new("runtime_tombstones");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const LAST_ENTITY_ID: &str = "last_entity_id";

fn table_for(space: Space) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match space {
        Space::Config => CONFIG,
        Space::Runtime => RUNTIME,
    }
}

fn tombstones_for(space: Space) -> TableDefinition<'static, &'static str, u64> {
    match space {
        Space::Config => CONFIG_TOMBSTONES,
        Space::Runtime => RUNTIME_TOMBSTONES,
    }
}

/// On-disk record of one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub version: u64,
    pub timestamp: i64,
    /// JSON text; postcard cannot carry self-describing `serde_json::Value`.
    pub json: String,
}

impl StoredEntry {
    fn to_bytes(&self) -> Result<Vec<u8>, ConsoleError> {
        postcard::to_allocvec(self).map_err(|e| ConsoleError::SerializationError(e.to_string()))
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ConsoleError> {
        postcard::from_bytes(bytes).map_err(|e| ConsoleError::SerializationError(e.to_string()))
    }

    fn into_keyed(self, key: &str) -> Result<KeyedValue<Value>, ConsoleError> {
        let value: Value = serde_json::from_str(&self.json)
            .map_err(|e| ConsoleError::SerializationError(e.to_string()))?;
        Ok(KeyedValue::new(key, value, self.version, self.timestamp))
    }
}

fn io(e: impl std::fmt::Display) -> ConsoleError {
    ConsoleError::IoError(e.to_string())
}

/// A disk-backed key space.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConsoleError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io)?;
            let _ = write_txn.open_table(CONFIG).map_err(io)?;
            let _ = write_txn.open_table(RUNTIME).map_err(io)?;
            let _ = write_txn.open_table(CONFIG_TOMBSTONES).map_err(io)?;
            let _ = write_txn.open_table(RUNTIME_TOMBSTONES).map_err(io)?;
            let _ = write_txn.open_table(METADATA).map_err(io)?;
            write_txn.commit().map_err(io)?;
        }

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), ConsoleError> {
        self.db.compact().map_err(io)?;
        Ok(())
    }

    fn write(
        &self,
        space: Space,
        key: &str,
        value: &Value,
        expected: Option<Option<u64>>,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        validate_key(key)?;
        let json = encode_value(value)?;

        let write_txn = self.db.begin_write().map_err(io)?;
        let entry = {
            let mut table = write_txn.open_table(table_for(space)).map_err(io)?;
            let mut tombstones = write_txn.open_table(tombstones_for(space)).map_err(io)?;
            let previous = match table.get(key).map_err(io)? {
                Some(guard) => Some(StoredEntry::from_bytes(guard.value())?.version),
                None => None,
            };
            if let Some(expected) = expected {
                check_expected(key, expected, previous)?;
            }
            let last = match previous {
                Some(version) => Some(version),
                None => tombstones.remove(key).map_err(io)?.map(|guard| guard.value()),
            };
            let entry = StoredEntry {
                version: next_version(last),
                timestamp: write_timestamp(),
                json,
            };
            let bytes = entry.to_bytes()?;
            table.insert(key, bytes.as_slice()).map_err(io)?;
            entry
        };
        write_txn.commit().map_err(io)?;

        Ok(KeyedValue::new(key, value.clone(), entry.version, entry.timestamp))
    }
}

impl KvStore for RedbStore {
    fn get(&self, space: Space, key: &str) -> Result<Option<KeyedValue<Value>>, ConsoleError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(table_for(space)).map_err(io)?;
        match table.get(key).map_err(io)? {
            Some(guard) => Ok(Some(StoredEntry::from_bytes(guard.value())?.into_keyed(key)?)),
            None => Ok(None),
        }
    }

    fn range(
        &self,
        space: Space,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<KeyedValue<Value>>, ConsoleError> {
        let prefix = normalize_prefix(prefix)?;
        let limit = effective_limit(limit);
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(table_for(space)).map_err(io)?;

        let mut out = Vec::new();
        let mut skipped = 0usize;
        for entry in table.range(prefix.as_str()..).map_err(io)? {
            if out.len() >= limit {
                break;
            }
            let (key, value) = entry.map_err(io)?;
            let key = key.value();
            if !key.starts_with(prefix.as_str()) {
                break;
            }
            if !covers(&prefix, key) {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            out.push(StoredEntry::from_bytes(value.value())?.into_keyed(key)?);
        }
        Ok(out)
    }

    fn put(
        &mut self,
        space: Space,
        key: &str,
        value: Value,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        self.write(space, key, &value, None)
    }

    fn put_if_version(
        &mut self,
        space: Space,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        self.write(space, key, &value, Some(expected))
    }

    fn remove(&mut self, space: Space, key: &str) -> Result<bool, ConsoleError> {
        let write_txn = self.db.begin_write().map_err(io)?;
        let existed = {
            let mut table = write_txn.open_table(table_for(space)).map_err(io)?;
            let removed = match table.remove(key).map_err(io)? {
                Some(guard) => Some(StoredEntry::from_bytes(guard.value())?.version),
                None => None,
            };
            if let Some(version) = removed {
                let mut tombstones = write_txn.open_table(tombstones_for(space)).map_err(io)?;
                tombstones.insert(key, version).map_err(io)?;
            }
            removed.is_some()
        };
        write_txn.commit().map_err(io)?;
        Ok(existed)
    }

    fn len(&self, space: Space) -> Result<usize, ConsoleError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(table_for(space)).map_err(io)?;
        let len = table.len().map_err(io)?;
        usize::try_from(len).map_err(io)
    }

    fn next_id(&mut self) -> Result<u64, ConsoleError> {
        let write_txn = self.db.begin_write().map_err(io)?;
        let id = {
            let mut meta = write_txn.open_table(METADATA).map_err(io)?;
            let last = meta
                .get(LAST_ENTITY_ID)
                .map_err(io)?
                .map(|guard| guard.value())
                .unwrap_or(0);
            let id = last.saturating_add(1);
            meta.insert(LAST_ENTITY_ID, id).map_err(io)?;
            id
        };
        write_txn.commit().map_err(io)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn put_get_roundtrip() {
        let dir = tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("kv.redb")).expect("open");
        let value = json!({ "key": "a1", "client": { "zookeeper.connect": "zk:2181" } });
        let stored = store
            .put(Space::Config, "/address/ns1/a1", value.clone())
            .expect("put");
        assert_eq!(stored.version, 1);
        let loaded = store
            .get(Space::Config, "/address/ns1/a1")
            .expect("get")
            .expect("present");
        assert_eq!(loaded.value, value);
        assert_eq!(loaded.version, 1);
        assert!(store.get(Space::Runtime, "/address/ns1/a1").expect("get").is_none());
    }

    #[test]
    fn preserves_field_order() {
        let dir = tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("kv.redb")).expect("open");
        let value = json!({ "zeta": "1", "alpha": "2", "mid": "3" });
        store.put(Space::Config, "/variable/ns1/v1", value).expect("put");
        let loaded = store
            .get(Space::Config, "/variable/ns1/v1")
            .expect("get")
            .expect("present");
        let keys: Vec<&String> = loaded.value.as_object().expect("object").keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn range_respects_segment_boundary() {
        let dir = tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("kv.redb")).expect("open");
        for key in ["/task/ns1/t1", "/task/ns1/t2", "/task/ns10/t3", "/variable/ns1/v1"] {
            store.put(Space::Config, key, json!({})).expect("put");
        }
        let keys: Vec<String> = store
            .range(Space::Config, "/task/ns1", 0, 100)
            .expect("range")
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, ["/task/ns1/t1", "/task/ns1/t2"]);

        let paged = store.range(Space::Config, "/task", 1, 1).expect("page");
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].key, "/task/ns1/t2");
    }

    #[test]
    fn conditional_put_and_remove() {
        let dir = tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("kv.redb")).expect("open");
        store
            .put_if_version(Space::Config, "/task/ns1/t1", json!({ "n": 1 }), None)
            .expect("create");
        assert!(matches!(
            store.put_if_version(Space::Config, "/task/ns1/t1", json!({ "n": 2 }), Some(7)),
            Err(ConsoleError::Conflict { actual: Some(1), .. })
        ));
        assert!(store.remove(Space::Config, "/task/ns1/t1").expect("remove"));
        assert!(!store.remove(Space::Config, "/task/ns1/t1").expect("again"));
        assert_eq!(store.len(Space::Config).expect("len"), 0);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("kv.redb");
        {
            let mut store = RedbStore::open(&path).expect("open");
            store
                .put(Space::Runtime, "/address/ns1/a1/owners", json!({ "keys": ["t1"] }))
                .expect("put");
            store
                .put(Space::Runtime, "/address/ns1/a1/owners", json!({ "keys": ["t1", "t2"] }))
                .expect("put");
        }
        let store = RedbStore::open(&path).expect("reopen");
        let loaded = store
            .get(Space::Runtime, "/address/ns1/a1/owners")
            .expect("get")
            .expect("present");
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.value, json!({ "keys": ["t1", "t2"] }));
    }

    #[test]
    fn tombstones_and_ids_survive_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("kv.redb");
        {
            let mut store = RedbStore::open(&path).expect("open");
            store.put(Space::Config, "/task/ns1/t1", json!({})).expect("v1");
            store.put(Space::Config, "/task/ns1/t1", json!({})).expect("v2");
            assert!(store.remove(Space::Config, "/task/ns1/t1").expect("remove"));
            assert_eq!(store.next_id().expect("id"), 1);
            assert_eq!(store.next_id().expect("id"), 2);
        }
        let mut store = RedbStore::open(&path).expect("reopen");
        let recreated = store
            .put_if_version(Space::Config, "/task/ns1/t1", json!({}), None)
            .expect("recreate");
        assert_eq!(recreated.version, 3);
        assert!(matches!(
            store.put_if_version(Space::Config, "/task/ns1/t1", json!({}), Some(2)),
            Err(ConsoleError::Conflict { actual: Some(3), .. })
        ));
        assert_eq!(store.next_id().expect("id"), 3);
    }
}

//! In-memory key space backed by one `BTreeMap` per space.

use super::{
    KvStore, Space, check_expected, effective_limit, encode_value, next_version, write_timestamp,
};
use crate::keyspace::{covers, normalize_prefix, validate_key};
use crate::{ConsoleError, KeyedValue};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    value: Value,
    version: u64,
    timestamp: i64,
}

#[derive(Debug, Clone, Default)]
struct Table {
    live: BTreeMap<String, Slot>,
    /// Last version of removed keys.
    tombstones: BTreeMap<String, u64>,
}

/// Volatile store. Contents are lost when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    config: Table,
    runtime: Table,
    last_id: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, space: Space) -> &BTreeMap<String, Slot> {
        match space {
            Space::Config => &self.config.live,
            Space::Runtime => &self.runtime.live,
        }
    }

    fn table_mut(&mut self, space: Space) -> &mut Table {
        match space {
            Space::Config => &mut self.config,
            Space::Runtime => &mut self.runtime,
        }
    }

    fn write(
        &mut self,
        space: Space,
        key: &str,
        value: Value,
        expected: Option<Option<u64>>,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        validate_key(key)?;
        encode_value(&value)?;
        let table = self.table_mut(space);
        let previous = table.live.get(key).map(|slot| slot.version);
        if let Some(expected) = expected {
            check_expected(key, expected, previous)?;
        }
        let last = previous.or_else(|| table.tombstones.get(key).copied());
        let slot = Slot {
            value,
            version: next_version(last),
            timestamp: write_timestamp(),
        };
        let stored = KeyedValue::new(key, slot.value.clone(), slot.version, slot.timestamp);
        table.tombstones.remove(key);
        table.live.insert(key.to_string(), slot);
        Ok(stored)
    }
}

impl KvStore for MemoryStore {
    fn get(&self, space: Space, key: &str) -> Result<Option<KeyedValue<Value>>, ConsoleError> {
        Ok(self
            .table(space)
            .get(key)
            .map(|slot| KeyedValue::new(key, slot.value.clone(), slot.version, slot.timestamp)))
    }

    fn range(
        &self,
        space: Space,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<KeyedValue<Value>>, ConsoleError> {
        let prefix = normalize_prefix(prefix)?;
        Ok(self
            .table(space)
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(prefix.as_str()))
            .filter(|(key, _)| covers(&prefix, key))
            .skip(offset)
            .take(effective_limit(limit))
            .map(|(key, slot)| KeyedValue::new(key, slot.value.clone(), slot.version, slot.timestamp))
            .collect())
    }

    fn put(
        &mut self,
        space: Space,
        key: &str,
        value: Value,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        self.write(space, key, value, None)
    }

    fn put_if_version(
        &mut self,
        space: Space,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        self.write(space, key, value, Some(expected))
    }

    fn remove(&mut self, space: Space, key: &str) -> Result<bool, ConsoleError> {
        let table = self.table_mut(space);
        match table.live.remove(key) {
            Some(slot) => {
                table.tombstones.insert(key.to_string(), slot.version);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn len(&self, space: Space) -> Result<usize, ConsoleError> {
        Ok(self.table(space).len())
    }

    fn next_id(&mut self) -> Result<u64, ConsoleError> {
        self.last_id = self.last_id.saturating_add(1);
        Ok(self.last_id)
    }
}

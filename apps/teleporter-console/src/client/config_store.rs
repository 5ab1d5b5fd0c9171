//! # Config Store
//!
//! CRUD and range over the config entries of one entity kind.

use super::{Entity, KvTransport};
use serde_json::Value;
use std::marker::PhantomData;
use teleporter_core::primitives::DEFAULT_RANGE_LIMIT;
use teleporter_core::{ConsoleError, EntityValue, KeyedValue, Scope, Space};

/// Typed access to `/{kind}/...` in the config space.
///
/// Keys passed in must lie under the entity kind's root; anything else is
/// `InvalidKey` before the transport is touched.
pub struct ConfigStore<E, T> {
    transport: T,
    _entity: PhantomData<fn() -> E>,
}

impl<E, T: Clone> Clone for ConfigStore<E, T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, T: KvTransport> ConfigStore<E, T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            _entity: PhantomData,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn check_owned(key: &str) -> Result<(), ConsoleError> {
        let root = format!("/{}", E::KIND);
        let owned = key
            .strip_prefix(root.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
        if owned {
            Ok(())
        } else {
            Err(ConsoleError::InvalidKey(format!(
                "{} is not a {} key",
                key,
                E::KIND
            )))
        }
    }

    /// Entries at or below `prefix`, lexicographic.
    pub async fn range(
        &self,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<KeyedValue<EntityValue>>, ConsoleError> {
        Self::check_owned(prefix)?;
        self.transport
            .range(Space::Config, prefix, offset, limit)
            .await?
            .into_iter()
            .map(KeyedValue::into_entity)
            .collect()
    }

    /// The first page (up to 2000 entries) of the kind within `scope`.
    pub async fn list(&self, scope: &Scope) -> Result<Vec<KeyedValue<EntityValue>>, ConsoleError> {
        let prefix = scope.prefix(E::KIND)?;
        self.range(&prefix, 0, DEFAULT_RANGE_LIMIT).await
    }

    /// The entry at `key`, or `NotFound`.
    pub async fn find_one(&self, key: &str) -> Result<KeyedValue<EntityValue>, ConsoleError> {
        Self::check_owned(key)?;
        self.transport
            .get(Space::Config, key)
            .await?
            .ok_or_else(|| ConsoleError::NotFound(key.to_string()))?
            .into_entity()
    }

    /// Unconditional upsert. Concurrent writers overwrite each other.
    pub async fn save(
        &self,
        key: &str,
        value: &EntityValue,
    ) -> Result<KeyedValue<EntityValue>, ConsoleError> {
        Self::check_owned(key)?;
        self.transport
            .put(Space::Config, key, Value::Object(value.clone()))
            .await?
            .into_entity()
    }

    /// Upsert only if the stored version still equals `expected`
    /// (`None` = must not exist yet). Fails with `Conflict` otherwise.
    pub async fn save_if_version(
        &self,
        key: &str,
        value: &EntityValue,
        expected: Option<u64>,
    ) -> Result<KeyedValue<EntityValue>, ConsoleError> {
        Self::check_owned(key)?;
        self.transport
            .put_if_version(Space::Config, key, Value::Object(value.clone()), expected)
            .await?
            .into_entity()
    }

    /// Delete the entry. Removing an absent key succeeds.
    pub async fn remove(&self, key: &str) -> Result<bool, ConsoleError> {
        Self::check_owned(key)?;
        self.transport.remove(Space::Config, key).await
    }

    /// Ask the processing engine to reload `key`.
    pub async fn refresh(&self, key: &str) -> Result<(), ConsoleError> {
        Self::check_owned(key)?;
        self.transport.refresh(key).await
    }
}

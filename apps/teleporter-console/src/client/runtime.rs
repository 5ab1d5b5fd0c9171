//! # Runtime Overlay Store
//!
//! Read-mostly access to the runtime space the processing engine writes.
//! The console itself only deletes overlays, and only on a best-effort basis.

use super::KvTransport;
use teleporter_core::keyspace::owners_key;
use teleporter_core::primitives::DEFAULT_RANGE_LIMIT;
use teleporter_core::{ConsoleError, EntityKind, KeyedValue, RuntimeRecord, Scope, Space};
use tokio::task::JoinSet;

/// Outcome of one row of [`RuntimeStore::lookup_many`].
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeLookup {
    pub key: String,
    /// `Ok(None)` when the engine has not reported anything for the key.
    pub record: Result<Option<KeyedValue<RuntimeRecord>>, ConsoleError>,
}

/// Access to `Space::Runtime`.
#[derive(Clone)]
pub struct RuntimeStore<T> {
    transport: T,
}

impl<T: KvTransport> RuntimeStore<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Ownership records of one address, i.e. the runtime entries at or
    /// below `/address/{ns}/{address}/owners`.
    pub async fn owners(
        &self,
        ns: &str,
        address: &str,
    ) -> Result<Vec<KeyedValue<RuntimeRecord>>, ConsoleError> {
        let config_key = Scope::namespace(ns).entity_key(EntityKind::Address, address)?;
        self.transport
            .range(Space::Runtime, &owners_key(&config_key), 0, DEFAULT_RANGE_LIMIT)
            .await?
            .into_iter()
            .map(|entry| entry.into_runtime())
            .collect()
    }

    /// The record at `key`, or `NotFound`.
    pub async fn find_one(&self, key: &str) -> Result<KeyedValue<RuntimeRecord>, ConsoleError> {
        self.get(key)
            .await?
            .ok_or_else(|| ConsoleError::NotFound(key.to_string()))
    }

    /// The record at `key`, `None` when absent.
    pub async fn get(&self, key: &str) -> Result<Option<KeyedValue<RuntimeRecord>>, ConsoleError> {
        self.transport
            .get(Space::Runtime, key)
            .await?
            .map(|entry| entry.into_runtime())
            .transpose()
    }

    /// Best-effort delete. Failures are logged, never returned: a stale
    /// overlay is harmless and the engine rewrites it.
    pub async fn remove(&self, key: &str) {
        match self.transport.remove(Space::Runtime, key).await {
            Ok(removed) => tracing::debug!(key, removed, "runtime record cleanup"),
            Err(e) => tracing::warn!(key, error = %e, "runtime record cleanup failed"),
        }
    }

    /// Fetch the records of `keys` concurrently. Results come back in the
    /// order of `keys`, one outcome per row.
    pub async fn lookup_many(&self, keys: &[String]) -> Vec<RuntimeLookup> {
        let mut tasks = JoinSet::new();
        for (index, key) in keys.iter().cloned().enumerate() {
            let store = self.clone();
            tasks.spawn(async move {
                let record = store.get(&key).await;
                (index, RuntimeLookup { key, record })
            });
        }

        let mut rows: Vec<Option<RuntimeLookup>> = vec![None; keys.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, row)) => rows[index] = Some(row),
                Err(e) => tracing::warn!(error = %e, "runtime lookup task failed"),
            }
        }

        rows.into_iter()
            .zip(keys)
            .map(|(row, key)| {
                row.unwrap_or_else(|| RuntimeLookup {
                    key: key.clone(),
                    record: Err(ConsoleError::RemoteFailure(format!(
                        "lookup of {} did not complete",
                        key
                    ))),
                })
            })
            .collect()
    }
}

//! Address extras: which tasks currently hold a connector.

use super::Controller;
use crate::client::{Address, KvTransport};
use teleporter_core::{ConsoleError, KeyedValue, RuntimeRecord};

impl<T: KvTransport> Controller<Address, T> {
    /// Ownership records of the address `key` in namespace `ns`.
    pub async fn owners(
        &self,
        ns: &str,
        key: &str,
    ) -> Result<Vec<KeyedValue<RuntimeRecord>>, ConsoleError> {
        self.runtime_store().owners(ns, key).await
    }

    /// Every owner key reported for the address, in record order.
    pub async fn owner_keys(&self, ns: &str, key: &str) -> Result<Vec<String>, ConsoleError> {
        Ok(self
            .owners(ns, key)
            .await?
            .into_iter()
            .flat_map(|record| record.value.owner_keys)
            .collect())
    }
}

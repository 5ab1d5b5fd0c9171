//! Variable extras: the engine-side value stored at the same path.

use super::Controller;
use crate::client::{KvTransport, Variable};
use serde::Serialize;
use teleporter_core::{ConsoleError, EntityValue, KeyedValue, RuntimeRecord, Scope};

/// A variable with its runtime overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableRow {
    pub config: KeyedValue<EntityValue>,
    pub runtime: Option<KeyedValue<RuntimeRecord>>,
    /// Set when the runtime lookup of this row failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_error: Option<String>,
}

impl<T: KvTransport> Controller<Variable, T> {
    /// Runtime record of the variable at `key`, `None` if not reported.
    pub async fn runtime(
        &self,
        key: &str,
    ) -> Result<Option<KeyedValue<RuntimeRecord>>, ConsoleError> {
        self.runtime_store().get(key).await
    }

    /// Variables within `scope`, each joined with its runtime record.
    ///
    /// A failed runtime lookup marks its own row and leaves the rest intact.
    pub async fn list_with_runtime(&self, scope: &Scope) -> Result<Vec<VariableRow>, ConsoleError> {
        let variables = self.list(scope).await?;
        let keys: Vec<String> = variables.iter().map(|v| v.key.clone()).collect();
        let lookups = self.runtime_store().lookup_many(&keys).await;

        Ok(variables
            .into_iter()
            .zip(lookups)
            .map(|(config, lookup)| match lookup.record {
                Ok(runtime) => VariableRow {
                    config,
                    runtime,
                    runtime_error: None,
                },
                Err(e) => VariableRow {
                    config,
                    runtime: None,
                    runtime_error: Some(e.to_string()),
                },
            })
            .collect())
    }
}

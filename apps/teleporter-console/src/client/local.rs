//! In-process transport over [`AppState`], for embedding and tests.

use super::KvTransport;
use crate::api::AppState;
use serde_json::Value;
use teleporter_core::{ConsoleError, KeyedValue, Space};

/// Calls the service state directly, skipping HTTP.
#[derive(Clone)]
pub struct LocalTransport {
    state: AppState,
}

impl LocalTransport {
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

impl KvTransport for LocalTransport {
    async fn get(&self, space: Space, key: &str) -> Result<Option<KeyedValue<Value>>, ConsoleError> {
        self.state.get(space, key).await
    }

    async fn range(
        &self,
        space: Space,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<KeyedValue<Value>>, ConsoleError> {
        self.state.range(space, prefix, offset, limit).await
    }

    async fn put(
        &self,
        space: Space,
        key: &str,
        value: Value,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        self.state.save(space, key, value).await
    }

    async fn put_if_version(
        &self,
        space: Space,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        self.state.save_if_version(space, key, value, expected).await
    }

    async fn remove(&self, space: Space, key: &str) -> Result<bool, ConsoleError> {
        self.state.remove(space, key).await
    }

    async fn refresh(&self, key: &str) -> Result<(), ConsoleError> {
        self.state.refresh(key).await
    }

    async fn next_id(&self) -> Result<u64, ConsoleError> {
        self.state.next_id().await
    }
}

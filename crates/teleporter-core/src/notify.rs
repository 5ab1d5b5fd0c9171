//! # Config Change Notifications
//!
//! The event the console emits when configuration changes or an operator asks
//! the processing engine to reload an entity.

use serde::{Deserialize, Serialize};

/// What happened to the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Upsert,
    Remove,
    /// Operator-triggered reload without a config change.
    Refresh,
}

/// A change notification for one config key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChangeNotify {
    pub key: String,
    pub action: ChangeAction,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ConfigChangeNotify {
    /// Notification stamped with the current time.
    pub fn now(key: impl Into<String>, action: ChangeAction) -> Self {
        Self {
            key: key.into(),
            action,
            timestamp: now_millis(),
        }
    }
}

/// Wall-clock milliseconds since the Unix epoch, `0` if the clock is before it.
#[must_use]
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

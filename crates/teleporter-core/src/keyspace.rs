//! # Hierarchical Key Space
//!
//! Path construction and validation for config and runtime keys.
//!
//! Config keys follow `/{kind}/{namespace}/{parents..}/{key}`; runtime overlays
//! use the same logical path (variables) or a sibling below it (address
//! `owners`). Segments are ASCII and never contain `/`.

use crate::primitives::{MAX_KEY_LENGTH, SEPARATOR};
use crate::{ConsoleError, EntityKind};

/// Suffix of the address ownership overlay.
pub const OWNERS_SEGMENT: &str = "owners";

/// Validate a single path segment (namespace, parent or entity key).
pub fn validate_segment(segment: &str) -> Result<(), ConsoleError> {
    if segment.is_empty() {
        return Err(ConsoleError::InvalidKey("empty segment".to_string()));
    }
    if segment.contains(SEPARATOR) {
        return Err(ConsoleError::InvalidKey(format!(
            "segment '{}' contains '/'",
            segment
        )));
    }
    if !segment.is_ascii() || segment.chars().any(|c| c.is_ascii_control()) {
        return Err(ConsoleError::InvalidKey(format!(
            "segment '{}' is not printable ASCII",
            segment
        )));
    }
    Ok(())
}

/// Validate a full hierarchical key: leading `/`, non-empty segments, no
/// trailing separator, bounded length.
pub fn validate_key(key: &str) -> Result<(), ConsoleError> {
    if key.len() > MAX_KEY_LENGTH {
        return Err(ConsoleError::InvalidKey(format!(
            "key length {} exceeds maximum {}",
            key.len(),
            MAX_KEY_LENGTH
        )));
    }
    let Some(rest) = key.strip_prefix(SEPARATOR) else {
        return Err(ConsoleError::InvalidKey(format!(
            "key '{}' must start with '/'",
            key
        )));
    };
    rest.split(SEPARATOR).try_for_each(validate_segment)
}

/// Normalize a range prefix: validated like a key, trailing separators
/// trimmed. The root prefix `/` is allowed and stays `/`.
pub fn normalize_prefix(prefix: &str) -> Result<String, ConsoleError> {
    let trimmed = prefix.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        return Ok(SEPARATOR.to_string());
    }
    validate_key(trimmed)?;
    Ok(trimmed.to_string())
}

/// Whether `key` lies at or below `prefix` on a segment boundary.
///
/// `/task/ns1` covers `/task/ns1` and `/task/ns1/t1`, never `/task/ns10/t1`.
/// `prefix` must already be normalized.
#[must_use]
pub fn covers(prefix: &str, key: &str) -> bool {
    if prefix == "/" {
        return key.starts_with(SEPARATOR);
    }
    match key.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with(SEPARATOR),
        None => false,
    }
}

// =============================================================================
// SCOPE
// =============================================================================

/// Where an entity lives: its namespace plus parent keys.
///
/// Streams carry their task as the single parent; sinks carry task and stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    namespace: String,
    parents: Vec<String>,
}

impl Scope {
    /// Scope with no parents (addresses, tasks, variables).
    pub fn namespace(ns: impl Into<String>) -> Self {
        Self {
            namespace: ns.into(),
            parents: Vec::new(),
        }
    }

    /// Scope with parent keys, outermost first.
    pub fn nested<I, S>(ns: impl Into<String>, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: ns.into(),
            parents: parents.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn ns(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    /// Check that the scope has the depth this kind requires and valid segments.
    pub fn check(&self, kind: EntityKind) -> Result<(), ConsoleError> {
        if self.parents.len() != kind.parent_depth() {
            return Err(ConsoleError::InvalidKey(format!(
                "{} requires {} parent key(s), got {}",
                kind,
                kind.parent_depth(),
                self.parents.len()
            )));
        }
        validate_segment(&self.namespace)?;
        self.parents.iter().try_for_each(|p| validate_segment(p))
    }

    /// Listing prefix for this kind, e.g. `/stream/ns1/task1`.
    pub fn prefix(&self, kind: EntityKind) -> Result<String, ConsoleError> {
        self.check(kind)?;
        let mut path = format!("/{}/{}", kind, self.namespace);
        for parent in &self.parents {
            path.push(SEPARATOR);
            path.push_str(parent);
        }
        Ok(path)
    }

    /// Full config key of one entity, e.g. `/address/ns1/a1`.
    pub fn entity_key(&self, kind: EntityKind, key: &str) -> Result<String, ConsoleError> {
        validate_segment(key)?;
        let mut path = self.prefix(kind)?;
        path.push(SEPARATOR);
        path.push_str(key);
        Ok(path)
    }
}

/// Runtime ownership key for an address config key.
#[must_use]
pub fn owners_key(config_key: &str) -> String {
    format!("{}/{}", config_key.trim_end_matches(SEPARATOR), OWNERS_SEGMENT)
}

//! # Schema Registry
//!
//! Pure lookup from `(entity kind, category, schema version)` to the ordered
//! field schema of that category's `client` block, plus the entity-level fixed
//! fields of every kind.
//!
//! The table is built once in [`SchemaRegistry::new`] and never mutated.
//! Lookup is a direct mapping: no inheritance, no fallback schema. An unknown
//! category is always `ConsoleError::UnknownCategory`, because persisting a
//! value against a guessed schema would silently drop fields on the next edit.

mod address;
mod entity;
mod sink;

use crate::schema::FieldSchema;
use crate::{ConsoleError, EntityKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Builds the client schema of one category.
pub type ClientSchemaFn = fn() -> FieldSchema;

type Table = &'static [(&'static str, ClientSchemaFn)];

// =============================================================================
// SCHEMA VERSION
// =============================================================================

/// Identifier of a client schema table generation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// Thirteen address categories, jdbc configured by `host`.
    #[default]
    V1,
    /// Nine address categories, jdbc configured by `jdbcUrl`.
    V2,
}

impl SchemaVersion {
    pub const ALL: [Self; 2] = [Self::V1, Self::V2];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVersion {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ConsoleError::UnknownSchemaVersion(s.to_string()))
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// The category → schema lookup table.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    version: SchemaVersion,
    clients: BTreeMap<(EntityKind, SchemaVersion), BTreeMap<&'static str, ClientSchemaFn>>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// Registry with every built-in table, resolving at the default version.
    #[must_use]
    pub fn new() -> Self {
        Self::with_version(SchemaVersion::default())
    }

    /// Registry with every built-in table, resolving at `version`.
    #[must_use]
    pub fn with_version(version: SchemaVersion) -> Self {
        let mut registry = Self {
            version,
            clients: BTreeMap::new(),
        };
        registry.register(EntityKind::Address, SchemaVersion::V1, address::V1);
        registry.register(EntityKind::Address, SchemaVersion::V2, address::V2);
        for v in SchemaVersion::ALL {
            registry.register(EntityKind::Sink, v, sink::ALL);
        }
        registry
    }

    fn register(&mut self, kind: EntityKind, version: SchemaVersion, table: Table) {
        let slot = self.clients.entry((kind, version)).or_default();
        for &(category, build) in table {
            slot.insert(category, build);
        }
    }

    /// The version used by the unversioned lookups.
    #[must_use]
    pub const fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Known categories of `kind` at the configured version, sorted.
    #[must_use]
    pub fn categories(&self, kind: EntityKind) -> Vec<&'static str> {
        self.categories_at(kind, self.version)
    }

    #[must_use]
    pub fn categories_at(&self, kind: EntityKind, version: SchemaVersion) -> Vec<&'static str> {
        self.clients
            .get(&(kind, version))
            .map(|table| table.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Client schema of `category` at the configured version.
    pub fn resolve_client_schema(
        &self,
        kind: EntityKind,
        category: &str,
    ) -> Result<FieldSchema, ConsoleError> {
        self.resolve_client_schema_at(kind, category, self.version)
    }

    /// Client schema of `category` at an explicit version.
    pub fn resolve_client_schema_at(
        &self,
        kind: EntityKind,
        category: &str,
        version: SchemaVersion,
    ) -> Result<FieldSchema, ConsoleError> {
        self.clients
            .get(&(kind, version))
            .and_then(|table| table.get(category))
            .map(|build| build())
            .ok_or_else(|| ConsoleError::UnknownCategory(category.to_string()))
    }

    /// Entity-level fields of `kind`. Category groups are left unbound.
    #[must_use]
    pub fn resolve_entity_schema(&self, kind: EntityKind) -> FieldSchema {
        entity::schema_for(kind)
    }

    /// The complete form schema of one entity.
    ///
    /// For categorized kinds the `client` group is bound to the category's
    /// schema and `category` defaults to the selected value. Passing a
    /// category to an uncategorized kind is rejected, not ignored.
    pub fn resolve_form_schema(
        &self,
        kind: EntityKind,
        category: Option<&str>,
    ) -> Result<FieldSchema, ConsoleError> {
        let mut schema = self.resolve_entity_schema(kind);
        match (kind.is_categorized(), category) {
            (true, Some(category)) => {
                let client = self.resolve_client_schema(kind, category)?;
                schema.bind_group("client", client)?;
                schema.set_default("category", category)?;
            }
            (true, None) => return Err(ConsoleError::MissingCategory(kind)),
            (false, Some(category)) => {
                return Err(ConsoleError::UnknownCategory(category.to_string()));
            }
            (false, None) => {}
        }
        Ok(schema)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, GroupSource};
    use serde_json::json;

    #[test]
    fn every_known_category_has_a_valid_non_empty_schema() {
        let registry = SchemaRegistry::new();
        for version in SchemaVersion::ALL {
            for kind in [EntityKind::Address, EntityKind::Sink] {
                let categories = registry.categories_at(kind, version);
                assert!(!categories.is_empty());
                for category in categories {
                    let schema = registry
                        .resolve_client_schema_at(kind, category, version)
                        .expect("known category");
                    assert!(!schema.is_empty(), "{kind}/{category}@{version} empty");
                    schema.validate().expect("unique keys");
                }
            }
        }
    }

    #[test]
    fn table_sizes_per_version() {
        let registry = SchemaRegistry::new();
        assert_eq!(
            registry.categories_at(EntityKind::Address, SchemaVersion::V1).len(),
            13
        );
        assert_eq!(
            registry.categories_at(EntityKind::Address, SchemaVersion::V2).len(),
            9
        );
        assert_eq!(registry.categories(EntityKind::Sink).len(), 4);
        assert!(registry.categories(EntityKind::Task).is_empty());
    }

    #[test]
    fn unknown_category_is_an_error() {
        let registry = SchemaRegistry::new();
        let before = registry.categories(EntityKind::Address);
        assert_eq!(
            registry.resolve_client_schema(EntityKind::Address, "unknown_type"),
            Err(ConsoleError::UnknownCategory("unknown_type".to_string()))
        );
        assert_eq!(registry.categories(EntityKind::Address), before);
    }

    #[test]
    fn versions_disagree_on_jdbc() {
        let registry = SchemaRegistry::new();
        let v1 = registry
            .resolve_client_schema_at(EntityKind::Address, "jdbc", SchemaVersion::V1)
            .expect("v1");
        let v2 = registry
            .resolve_client_schema_at(EntityKind::Address, "jdbc", SchemaVersion::V2)
            .expect("v2");
        assert!(v1.get("host").is_some() && v1.get("jdbcUrl").is_none());
        assert!(v2.get("jdbcUrl").is_some() && v2.get("host").is_none());
    }

    #[test]
    fn v2_drops_categories_outside_its_table() {
        let registry = SchemaRegistry::with_version(SchemaVersion::V2);
        assert!(matches!(
            registry.resolve_client_schema(EntityKind::Address, "mongo"),
            Err(ConsoleError::UnknownCategory(_))
        ));
    }

    #[test]
    fn form_schema_binds_client_and_category() {
        let registry = SchemaRegistry::new();
        let schema = registry
            .resolve_form_schema(EntityKind::Address, Some("kudu"))
            .expect("schema");
        assert_eq!(
            schema.get("category").and_then(|f| f.default.clone()),
            Some(json!("kudu"))
        );
        let client = registry
            .resolve_client_schema(EntityKind::Address, "kudu")
            .expect("client");
        assert_eq!(client.keys().collect::<Vec<_>>(), ["kuduMaster", "workerCount"]);
        assert_eq!(
            schema.get("client").map(|f| &f.kind),
            Some(&FieldKind::FixedGroup(GroupSource::Schema(client)))
        );
    }

    #[test]
    fn form_schema_category_rules() {
        let registry = SchemaRegistry::new();
        assert_eq!(
            registry.resolve_form_schema(EntityKind::Sink, None),
            Err(ConsoleError::MissingCategory(EntityKind::Sink))
        );
        assert!(matches!(
            registry.resolve_form_schema(EntityKind::Task, Some("kafka")),
            Err(ConsoleError::UnknownCategory(_))
        ));
        let task = registry
            .resolve_form_schema(EntityKind::Task, None)
            .expect("task");
        assert_eq!(task.get("key").map(|f| f.required), Some(true));
    }

    #[test]
    fn entity_schemas_are_key_unique() {
        let registry = SchemaRegistry::new();
        for kind in EntityKind::ALL {
            let schema = registry.resolve_entity_schema(kind);
            schema.validate().expect("unique keys");
            assert_eq!(schema.fields()[0].key, "id");
        }
    }

    #[test]
    fn schema_version_parses() {
        assert_eq!("v2".parse::<SchemaVersion>(), Ok(SchemaVersion::V2));
        assert!("v9".parse::<SchemaVersion>().is_err());
    }
}

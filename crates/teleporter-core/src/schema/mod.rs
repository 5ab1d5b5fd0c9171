//! # Field Schema Model
//!
//! The declarative vocabulary the schema registry draws from.
//!
//! A [`FieldSchema`] is an ordered list of [`FieldDescriptor`]s. Each descriptor
//! exposes `(key, label, kind, required, default)` and is read polymorphically
//! by the form materializer, which never needs to know the concrete entity.
//!
//! ## Field Kinds
//!
//! - `Text`, `Number`, `ReadOnly` — leaf values
//! - `Multiline` — large text blobs (embedded XML site files)
//! - `DynamicGroup` — open mapping of caller-chosen keys to strings
//! - `FixedGroup` — nested schema, either given or resolved by category
//! - `List` — ordered homogeneous items (text or nested group)

use crate::ConsoleError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

// =============================================================================
// FIELD KIND
// =============================================================================

/// Where a fixed group gets its nested schema from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "schema", rename_all = "snake_case")]
pub enum GroupSource {
    /// Nested schema known up front.
    Schema(FieldSchema),
    /// Nested schema selected at runtime by the entity's category.
    ///
    /// Must be bound through [`FieldSchema::bind_group`] before materializing.
    Category,
}

/// Item shape of a repeatable list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "item", content = "schema", rename_all = "snake_case")]
pub enum ItemKind {
    Text,
    Group(FieldSchema),
}

/// The closed set of field kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    ReadOnly,
    Multiline,
    DynamicGroup,
    FixedGroup(GroupSource),
    List(ItemKind),
}

impl FieldKind {
    /// Kinds whose value is a single editable string.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Text | Self::Number | Self::Multiline)
    }
}

// =============================================================================
// FIELD DESCRIPTOR
// =============================================================================

/// One editable field of a schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    /// Leaf key, unique within its schema. May contain dots (`group.id`).
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    /// Value substituted when the entity has none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Display hint only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl FieldDescriptor {
    /// Create a descriptor whose label equals its key.
    pub fn new(key: impl Into<String>, kind: FieldKind) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            kind,
            required: false,
            default: None,
            placeholder: None,
        }
    }

    pub fn text(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::Text)
    }

    pub fn number(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::Number)
    }

    pub fn readonly(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::ReadOnly)
    }

    pub fn multiline(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::Multiline)
    }

    pub fn dynamic_group(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::DynamicGroup)
    }

    pub fn group(key: impl Into<String>, schema: FieldSchema) -> Self {
        Self::new(key, FieldKind::FixedGroup(GroupSource::Schema(schema)))
    }

    /// A group whose schema is picked by category at resolution time.
    pub fn category_group(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::FixedGroup(GroupSource::Category))
    }

    pub fn list(key: impl Into<String>, item: ItemKind) -> Self {
        Self::new(key, FieldKind::List(item))
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn placeholder(mut self, hint: impl Into<String>) -> Self {
        self.placeholder = Some(hint.into());
        self
    }
}

// =============================================================================
// FIELD SCHEMA
// =============================================================================

/// Ordered sequence of field descriptors.
///
/// Order is significant for display only.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct FieldSchema {
    fields: Vec<FieldDescriptor>,
}

impl FieldSchema {
    #[must_use]
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Keys in schema order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    /// Reject duplicate or slash-bearing keys at every nesting level.
    pub fn validate(&self) -> Result<(), ConsoleError> {
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if field.key.is_empty() || field.key.contains('/') {
                return Err(ConsoleError::InvalidKey(format!(
                    "field key '{}'",
                    field.key
                )));
            }
            if !seen.insert(field.key.as_str()) {
                return Err(ConsoleError::DuplicateField(field.key.clone()));
            }
            match &field.kind {
                FieldKind::FixedGroup(GroupSource::Schema(nested))
                | FieldKind::List(ItemKind::Group(nested)) => nested.validate()?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Replace the `Category` source of group `key` with a concrete schema.
    ///
    /// Returns `UnknownField` if no category-resolved group has this key.
    pub fn bind_group(&mut self, key: &str, schema: FieldSchema) -> Result<(), ConsoleError> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.key == key && f.kind == FieldKind::FixedGroup(GroupSource::Category))
            .ok_or_else(|| ConsoleError::UnknownField(key.to_string()))?;
        field.kind = FieldKind::FixedGroup(GroupSource::Schema(schema));
        Ok(())
    }

    /// Set the default of field `key`.
    pub fn set_default(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ConsoleError> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.key == key)
            .ok_or_else(|| ConsoleError::UnknownField(key.to_string()))?;
        field.default = Some(value.into());
        Ok(())
    }
}

impl From<Vec<FieldDescriptor>> for FieldSchema {
    fn from(fields: Vec<FieldDescriptor>) -> Self {
        Self::new(fields)
    }
}

impl<'a> IntoIterator for &'a FieldSchema {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

// =============================================================================
// TESTS
// =============================================================================

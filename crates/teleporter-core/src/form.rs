//! # Form Materializer
//!
//! Turns a [`FieldSchema`] plus an entity value into an [`EditableForm`] with
//! defaults applied, and turns the form back into a plain [`EntityValue`].
//!
//! ## Round-trip Law
//!
//! `materialize(schema, v).serialize() == v` for every `v` whose keys are
//! exactly the schema's keys and whose groups and lists are well formed.
//! Keys of `v` that the schema does not declare are dropped. That loss is
//! intentional: the schema is the contract for what an entity carries.
//!
//! ## Defaults
//!
//! A field missing from the initial value takes the descriptor default, or
//! the zero value of its kind (`""`, `0`, `{}`, `[]`; readonly fields stay
//! absent). Required fields with neither stay empty and are reported by
//! [`EditableForm::issues`] until filled.

use crate::schema::{FieldDescriptor, FieldKind, FieldSchema, GroupSource, ItemKind};
use crate::types::{FieldIssue, IssueKind};
use crate::{ConsoleError, EntityValue};
use serde_json::{Number, Value};

// =============================================================================
// FORM VALUES
// =============================================================================

/// Current value of one form field.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    /// Raw operator input of a text, number or multiline field.
    Scalar(String),
    /// Readonly value, carried through untouched.
    Fixed(Option<Value>),
    /// Dynamic group entries in display order.
    Entries(Vec<(String, String)>),
    /// Nested fixed group.
    Group(EditableForm),
    /// Repeatable list items.
    Items(Vec<ListItem>),
}

/// One item of a repeatable list.
#[derive(Debug, Clone, PartialEq)]
pub enum ListItem {
    Scalar(String),
    Group(EditableForm),
}

/// A descriptor paired with its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    descriptor: FieldDescriptor,
    value: FormValue,
}

impl FormField {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.descriptor.key
    }

    #[must_use]
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn value(&self) -> &FormValue {
        &self.value
    }
}

// =============================================================================
// EDITABLE FORM
// =============================================================================

/// The in-memory form of one edit session, one field per descriptor in
/// schema order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditableForm {
    fields: Vec<FormField>,
}

/// Build an editable form from `schema` and an existing (possibly empty) value.
///
/// Fails with `UnresolvedGroup` if a category group was never bound.
pub fn materialize(schema: &FieldSchema, initial: &EntityValue) -> Result<EditableForm, ConsoleError> {
    let fields = schema
        .fields()
        .iter()
        .map(|descriptor| {
            let value = materialize_value(descriptor, initial.get(&descriptor.key))?;
            Ok(FormField {
                descriptor: descriptor.clone(),
                value,
            })
        })
        .collect::<Result<Vec<_>, ConsoleError>>()?;
    Ok(EditableForm { fields })
}

fn materialize_value(
    descriptor: &FieldDescriptor,
    initial: Option<&Value>,
) -> Result<FormValue, ConsoleError> {
    let initial = initial.filter(|v| !v.is_null());
    let default = descriptor.default.as_ref();

    let value = match &descriptor.kind {
        FieldKind::Text | FieldKind::Multiline => {
            FormValue::Scalar(initial.or(default).map(scalar_text).unwrap_or_default())
        }
        FieldKind::Number => FormValue::Scalar(
            initial
                .or(default)
                .map(scalar_text)
                .unwrap_or_else(|| zero_number(descriptor)),
        ),
        FieldKind::ReadOnly => FormValue::Fixed(initial.or(default).cloned()),
        FieldKind::DynamicGroup => FormValue::Entries(
            initial
                .and_then(Value::as_object)
                .or_else(|| default.and_then(Value::as_object))
                .map(entries_of)
                .unwrap_or_default(),
        ),
        FieldKind::FixedGroup(GroupSource::Schema(nested)) => {
            let empty = EntityValue::new();
            let source = initial
                .and_then(Value::as_object)
                .or_else(|| default.and_then(Value::as_object))
                .unwrap_or(&empty);
            FormValue::Group(materialize(nested, source)?)
        }
        FieldKind::FixedGroup(GroupSource::Category) => {
            return Err(ConsoleError::UnresolvedGroup(descriptor.key.clone()));
        }
        FieldKind::List(item) => {
            let source = initial
                .and_then(Value::as_array)
                .or_else(|| default.and_then(Value::as_array));
            let items = match source {
                Some(values) => values
                    .iter()
                    .map(|v| materialize_item(item, Some(v)))
                    .collect::<Result<Vec<_>, ConsoleError>>()?,
                None => Vec::new(),
            };
            FormValue::Items(items)
        }
    };
    Ok(value)
}

fn materialize_item(item: &ItemKind, initial: Option<&Value>) -> Result<ListItem, ConsoleError> {
    match item {
        ItemKind::Text => Ok(ListItem::Scalar(initial.map(scalar_text).unwrap_or_default())),
        ItemKind::Group(schema) => {
            let empty = EntityValue::new();
            let source = initial.and_then(Value::as_object).unwrap_or(&empty);
            Ok(ListItem::Group(materialize(schema, source)?))
        }
    }
}

/// Required numbers start empty so they show up as missing; optional ones
/// start at zero.
fn zero_number(descriptor: &FieldDescriptor) -> String {
    if descriptor.required {
        String::new()
    } else {
        "0".to_string()
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn entries_of(map: &EntityValue) -> Vec<(String, String)> {
    map.iter()
        .map(|(k, v)| (k.clone(), scalar_text(v)))
        .collect()
}

fn parse_number(raw: &str) -> Option<Number> {
    raw.trim().parse::<Number>().ok()
}

impl EditableForm {
    /// Materialize a form; see [`materialize`].
    pub fn materialize(schema: &FieldSchema, initial: &EntityValue) -> Result<Self, ConsoleError> {
        materialize(schema, initial)
    }

    #[must_use]
    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.descriptor.key == key)
    }

    fn field_mut(&mut self, key: &str) -> Result<&mut FormField, ConsoleError> {
        self.fields
            .iter_mut()
            .find(|f| f.descriptor.key == key)
            .ok_or_else(|| ConsoleError::UnknownField(key.to_string()))
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<&FormValue> {
        self.field(key).map(FormField::value)
    }

    /// Raw text of a scalar field.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.value(key)? {
            FormValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    /// Set the raw text of a text, number or multiline field.
    pub fn set_text(&mut self, key: &str, text: impl Into<String>) -> Result<(), ConsoleError> {
        let field = self.field_mut(key)?;
        match &mut field.value {
            FormValue::Scalar(current) => {
                *current = text.into();
                Ok(())
            }
            FormValue::Fixed(_) => Err(ConsoleError::ReadOnlyField(key.to_string())),
            _ => Err(ConsoleError::UnknownField(format!("{key} (not a text field)"))),
        }
    }

    /// Fill a readonly field that has no value yet.
    ///
    /// Readonly values are set once by the system, never by operator input.
    /// A field that already carries a value is `ReadOnlyField`.
    pub fn assign(&mut self, key: &str, value: Value) -> Result<(), ConsoleError> {
        let field = self.field_mut(key)?;
        match &mut field.value {
            FormValue::Fixed(current @ (None | Some(Value::Null))) => {
                *current = Some(value);
                Ok(())
            }
            FormValue::Fixed(_) => Err(ConsoleError::ReadOnlyField(key.to_string())),
            _ => Err(ConsoleError::UnknownField(format!("{key} (not readonly)"))),
        }
    }

    /// Nested form of a fixed group.
    pub fn group_mut(&mut self, key: &str) -> Result<&mut Self, ConsoleError> {
        match &mut self.field_mut(key)?.value {
            FormValue::Group(form) => Ok(form),
            _ => Err(ConsoleError::UnknownField(format!("{key} (not a group)"))),
        }
    }

    /// Entries of a dynamic group.
    pub fn entries_mut(&mut self, key: &str) -> Result<&mut Vec<(String, String)>, ConsoleError> {
        match &mut self.field_mut(key)?.value {
            FormValue::Entries(entries) => Ok(entries),
            _ => Err(ConsoleError::UnknownField(format!("{key} (not a dynamic group)"))),
        }
    }

    /// Items of a repeatable list.
    pub fn items_mut(&mut self, key: &str) -> Result<&mut Vec<ListItem>, ConsoleError> {
        match &mut self.field_mut(key)?.value {
            FormValue::Items(items) => Ok(items),
            _ => Err(ConsoleError::UnknownField(format!("{key} (not a list)"))),
        }
    }

    /// Append an empty item to list `key`, shaped by its item kind.
    pub fn push_item(&mut self, key: &str) -> Result<&mut ListItem, ConsoleError> {
        let field = self.field_mut(key)?;
        let FieldKind::List(item_kind) = &field.descriptor.kind else {
            return Err(ConsoleError::UnknownField(format!("{key} (not a list)")));
        };
        let item = materialize_item(item_kind, None)?;
        match &mut field.value {
            FormValue::Items(items) => {
                items.push(item);
                let last = items.len() - 1;
                Ok(&mut items[last])
            }
            _ => Err(ConsoleError::UnknownField(format!("{key} (not a list)"))),
        }
    }

    /// Overlay operator input onto the form.
    ///
    /// Keys the schema does not declare are ignored, as are readonly fields.
    /// Groups merge recursively; dynamic groups and lists are replaced.
    pub fn apply(&mut self, patch: &EntityValue) -> Result<(), ConsoleError> {
        for field in &mut self.fields {
            let Some(incoming) = patch.get(&field.descriptor.key) else {
                continue;
            };
            match (&mut field.value, &field.descriptor.kind) {
                (FormValue::Fixed(_), _) => {}
                (FormValue::Scalar(current), _) => *current = scalar_text(incoming),
                (FormValue::Entries(entries), _) => {
                    let map = expect_object(&field.descriptor.key, incoming)?;
                    *entries = entries_of(map);
                }
                (FormValue::Group(nested), _) => {
                    let map = expect_object(&field.descriptor.key, incoming)?;
                    nested.apply(map)?;
                }
                (FormValue::Items(items), FieldKind::List(item_kind)) => {
                    let values = incoming.as_array().ok_or_else(|| {
                        ConsoleError::SerializationError(format!(
                            "field {}: expected an array",
                            field.descriptor.key
                        ))
                    })?;
                    *items = values
                        .iter()
                        .map(|v| materialize_item(item_kind, Some(v)))
                        .collect::<Result<Vec<_>, ConsoleError>>()?;
                }
                (FormValue::Items(_), _) => {}
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Every validation finding, depth first in schema order.
    #[must_use]
    pub fn issues(&self) -> Vec<FieldIssue> {
        let mut out = Vec::new();
        self.collect_issues(&mut Vec::new(), &mut out);
        out
    }

    fn collect_issues(&self, path: &mut Vec<String>, out: &mut Vec<FieldIssue>) {
        for field in &self.fields {
            path.push(field.descriptor.key.clone());
            let required = field.descriptor.required;
            let issue = match &field.value {
                FormValue::Scalar(raw) if raw.trim().is_empty() => {
                    required.then_some(IssueKind::Required)
                }
                FormValue::Scalar(raw) => (field.descriptor.kind == FieldKind::Number
                    && parse_number(raw).is_none())
                .then_some(IssueKind::NotANumber),
                FormValue::Fixed(value) => {
                    let empty = match value {
                        None | Some(Value::Null) => true,
                        Some(Value::String(s)) => s.is_empty(),
                        Some(_) => false,
                    };
                    (required && empty).then_some(IssueKind::Required)
                }
                FormValue::Entries(entries) => {
                    (required && entries.is_empty()).then_some(IssueKind::Required)
                }
                FormValue::Group(_) => None,
                FormValue::Items(items) => {
                    (required && items.is_empty()).then_some(IssueKind::Required)
                }
            };
            if let Some(kind) = issue {
                out.push(FieldIssue {
                    path: path.clone(),
                    kind,
                });
            }
            match &field.value {
                FormValue::Group(nested) => nested.collect_issues(path, out),
                FormValue::Items(items) => {
                    for (index, item) in items.iter().enumerate() {
                        if let ListItem::Group(nested) = item {
                            path.push(index.to_string());
                            nested.collect_issues(path, out);
                            path.pop();
                        }
                    }
                }
                _ => {}
            }
            path.pop();
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues().is_empty()
    }

    /// `ValidationFailed` with every finding, or `Ok` if submittable.
    pub fn validate(&self) -> Result<(), ConsoleError> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConsoleError::ValidationFailed(issues))
        }
    }

    // -------------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------------

    /// Collect current values back into a plain entity value.
    ///
    /// Does not validate; a malformed number is emitted as the raw string.
    #[must_use]
    pub fn serialize(&self) -> EntityValue {
        let mut out = EntityValue::new();
        for field in &self.fields {
            let value = match &field.value {
                FormValue::Scalar(raw) if field.descriptor.kind == FieldKind::Number => {
                    match parse_number(raw) {
                        Some(n) => Value::Number(n),
                        None if raw.trim().is_empty() => Value::Null,
                        None => Value::String(raw.clone()),
                    }
                }
                FormValue::Scalar(raw) => Value::String(raw.clone()),
                FormValue::Fixed(None) => continue,
                FormValue::Fixed(Some(v)) => v.clone(),
                FormValue::Entries(entries) => Value::Object(
                    entries
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                ),
                FormValue::Group(nested) => Value::Object(nested.serialize()),
                FormValue::Items(items) => Value::Array(
                    items
                        .iter()
                        .map(|item| match item {
                            ListItem::Scalar(s) => Value::String(s.clone()),
                            ListItem::Group(nested) => Value::Object(nested.serialize()),
                        })
                        .collect(),
                ),
            };
            out.insert(field.descriptor.key.clone(), value);
        }
        out
    }

    /// Validate, then serialize. The form is consumed: it never outlives
    /// the edit session that submits it.
    pub fn submit(self) -> Result<EntityValue, ConsoleError> {
        self.validate()?;
        Ok(self.serialize())
    }
}

fn expect_object<'a>(key: &str, value: &'a Value) -> Result<&'a EntityValue, ConsoleError> {
    value.as_object().ok_or_else(|| {
        ConsoleError::SerializationError(format!("field {key}: expected an object"))
    })
}

// =============================================================================
// TESTS
// =============================================================================

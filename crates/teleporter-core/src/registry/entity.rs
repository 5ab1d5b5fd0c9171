//! Entity-level schemas: the fixed fields around the category `client` block.

use crate::EntityKind;
use crate::schema::{FieldDescriptor as F, FieldSchema, ItemKind};

pub(super) fn schema_for(kind: EntityKind) -> FieldSchema {
    match kind {
        EntityKind::Address => address(),
        EntityKind::Task => task(),
        EntityKind::Stream => stream(),
        EntityKind::Sink => sink(),
        EntityKind::Variable => variable(),
    }
}

fn id() -> F {
    F::readonly("id")
}

fn key() -> F {
    F::text("key").required()
}

fn address() -> FieldSchema {
    FieldSchema::new(vec![
        id(),
        key(),
        F::readonly("category"),
        F::category_group("client"),
        F::dynamic_group("arguments"),
    ])
}

fn task() -> FieldSchema {
    FieldSchema::new(vec![
        id(),
        key(),
        F::text("name").required(),
        F::dynamic_group("extraKeys"),
        F::dynamic_group("arguments"),
        F::multiline("template"),
    ])
}

fn stream() -> FieldSchema {
    FieldSchema::new(vec![
        id(),
        key(),
        F::text("name").required(),
        F::dynamic_group("arguments"),
        F::multiline("template"),
    ])
}

fn sink() -> FieldSchema {
    FieldSchema::new(vec![
        id(),
        key(),
        F::text("name").required(),
        F::readonly("category"),
        F::text("address").required(),
        F::dynamic_group("extraKeys"),
        F::list("errorRules", ItemKind::Text),
        F::category_group("client"),
        F::dynamic_group("arguments"),
    ])
}

fn variable() -> FieldSchema {
    FieldSchema::new(vec![id(), key(), F::text("name"), F::dynamic_group("arguments")])
}

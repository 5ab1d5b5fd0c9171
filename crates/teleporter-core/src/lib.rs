//! # teleporter-core
//!
//! The configuration model of the Teleporter console.
//!
//! This crate holds everything that does not need a network:
//! - `types`: entity kinds, keyed values, runtime records, errors
//! - `schema` / `registry`: field schemas and the category lookup table
//! - `form`: materialize, edit, validate and serialize entity forms
//! - `keyspace`: hierarchical key construction and prefix rules
//! - `storage`: the KV service model (memory and redb backends)
//! - `notify`: change notifications sent to the processing engine
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies
//! - Deterministic: `BTreeMap` ordering, no hash-map iteration
//! - Errors only through `ConsoleError`, never panics on user input

// =============================================================================
// MODULES
// =============================================================================

pub mod form;
pub mod keyspace;
pub mod notify;
pub mod primitives;
pub mod registry;
pub mod schema;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    ConsoleError, EntityKind, EntityValue, FieldIssue, IssueKind, KeyedValue, RuntimeRecord,
};

// =============================================================================
// RE-EXPORTS: Schema and Forms
// =============================================================================

pub use form::{EditableForm, FormField, FormValue, ListItem, materialize};
pub use registry::{SchemaRegistry, SchemaVersion};
pub use schema::{FieldDescriptor, FieldKind, FieldSchema, GroupSource, ItemKind};

// =============================================================================
// RE-EXPORTS: Key Space and Storage
// =============================================================================

pub use keyspace::{Scope, owners_key};
pub use notify::{ChangeAction, ConfigChangeNotify};
pub use storage::{Keyspace, KvStore, MemoryStore, RedbStore, Space};

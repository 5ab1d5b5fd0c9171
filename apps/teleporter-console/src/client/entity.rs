//! Entity markers: one zero-sized type per entity kind.
//!
//! Stores and controllers are generic over a marker so that an address store
//! cannot be handed a task key.

use teleporter_core::{EntityKind, owners_key};

/// Compile-time description of an entity kind.
pub trait Entity: Send + Sync + 'static {
    const KIND: EntityKind;

    /// Runtime overlay removed after the config entry at `config_key` is
    /// deleted. `None` means the kind has no overlay to clean up.
    fn runtime_cleanup_key(_config_key: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Address;

#[derive(Debug, Clone, Copy, Default)]
pub struct Task;

#[derive(Debug, Clone, Copy, Default)]
pub struct Stream;

#[derive(Debug, Clone, Copy, Default)]
pub struct Sink;

#[derive(Debug, Clone, Copy, Default)]
pub struct Variable;

impl Entity for Address {
    const KIND: EntityKind = EntityKind::Address;

    /// The owners record of the address.
    fn runtime_cleanup_key(config_key: &str) -> Option<String> {
        Some(owners_key(config_key))
    }
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Task;
}

impl Entity for Stream {
    const KIND: EntityKind = EntityKind::Stream;
}

impl Entity for Sink {
    const KIND: EntityKind = EntityKind::Sink;
}

impl Entity for Variable {
    const KIND: EntityKind = EntityKind::Variable;

    /// Variables keep their runtime value under the same path.
    fn runtime_cleanup_key(config_key: &str) -> Option<String> {
        Some(config_key.to_string())
    }
}

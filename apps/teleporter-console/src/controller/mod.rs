//! # Entity Controllers
//!
//! One generic controller per entity kind. A controller turns operator input
//! into stored entities: it resolves the form schema, materializes the form,
//! validates and serializes it, and writes the result to the config space.
//!
//! The first write of an entity gives it a numeric `id` from the service's
//! sequence. Later writes keep the stored id; operator input cannot change it.
//!
//! Kind-specific extras live next to their markers:
//! - [`address`]: `owners`
//! - [`variable`]: `runtime`, `list_with_runtime`

pub mod address;
pub mod variable;

pub use variable::VariableRow;

use crate::client::{
    Address, ConfigStore, Entity, KvTransport, RuntimeStore, Sink, Stream, Task, Variable,
};
use serde_json::Value;
use std::sync::Arc;
use teleporter_core::{
    ConsoleError, EditableForm, EntityValue, FormValue, KeyedValue, SchemaRegistry, Scope,
    materialize,
};

/// Readonly field carrying the identity the store assigned to an entity.
pub const ID_FIELD: &str = "id";

pub type AddressController<T> = Controller<Address, T>;
pub type TaskController<T> = Controller<Task, T>;
pub type StreamController<T> = Controller<Stream, T>;
pub type SinkController<T> = Controller<Sink, T>;
pub type VariableController<T> = Controller<Variable, T>;

/// List/create/edit/delete/refresh for entity kind `E`.
pub struct Controller<E, T> {
    registry: Arc<SchemaRegistry>,
    config: ConfigStore<E, T>,
    runtime: RuntimeStore<T>,
}

impl<E: Entity, T: KvTransport> Controller<E, T> {
    pub fn new(transport: T, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            config: ConfigStore::new(transport.clone()),
            runtime: RuntimeStore::new(transport),
        }
    }

    pub fn config(&self) -> &ConfigStore<E, T> {
        &self.config
    }

    pub fn runtime_store(&self) -> &RuntimeStore<T> {
        &self.runtime
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Entities of this kind within `scope`.
    pub async fn list(&self, scope: &Scope) -> Result<Vec<KeyedValue<EntityValue>>, ConsoleError> {
        self.config.list(scope).await
    }

    /// Empty form with defaults applied. Categorized kinds need `category`.
    pub fn new_form(&self, category: Option<&str>) -> Result<EditableForm, ConsoleError> {
        let schema = self.registry.resolve_form_schema(E::KIND, category)?;
        materialize(&schema, &EntityValue::new())
    }

    /// Form pre-filled from the stored entity at `key`, with the entry it was
    /// built from (its version guards a later `submit_if_version`).
    pub async fn edit_form(
        &self,
        key: &str,
    ) -> Result<(KeyedValue<EntityValue>, EditableForm), ConsoleError> {
        let entry = self.config.find_one(key).await?;
        let category = stored_category::<E>(&entry.value)?;
        let schema = self.registry.resolve_form_schema(E::KIND, category)?;
        let form = materialize(&schema, &entry.value)?;
        Ok((entry, form))
    }

    /// Validate and store `form` under `scope`. Last writer wins.
    pub async fn submit(
        &self,
        scope: &Scope,
        form: EditableForm,
    ) -> Result<KeyedValue<EntityValue>, ConsoleError> {
        self.store(scope, form, None).await
    }

    /// Validate and store `form` only if the entry is still at `expected`.
    pub async fn submit_if_version(
        &self,
        scope: &Scope,
        form: EditableForm,
        expected: Option<u64>,
    ) -> Result<KeyedValue<EntityValue>, ConsoleError> {
        self.store(scope, form, Some(expected)).await
    }

    /// New entity from operator input: defaults, then `input`, then submit.
    pub async fn create(
        &self,
        scope: &Scope,
        category: Option<&str>,
        input: &EntityValue,
    ) -> Result<KeyedValue<EntityValue>, ConsoleError> {
        let mut form = self.new_form(category)?;
        form.apply(input)?;
        self.submit(scope, form).await
    }

    /// Create or update from operator input.
    ///
    /// An existing entity is edited in place (its stored values kept where
    /// `input` is silent) and written with a version check. The category of
    /// an existing entity cannot change; a different `category` is rejected
    /// as `ReadOnlyField`.
    pub async fn apply(
        &self,
        scope: &Scope,
        category: Option<&str>,
        input: &EntityValue,
    ) -> Result<KeyedValue<EntityValue>, ConsoleError> {
        let key = self.entity_key(scope, input)?;
        let existing = match self.config.find_one(&key).await {
            Ok(entry) => Some(entry),
            Err(ConsoleError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        let Some(entry) = existing else {
            return self.create(scope, category, input).await;
        };

        let stored = stored_category::<E>(&entry.value)?;
        if category.is_some_and(|requested| Some(requested) != stored) {
            return Err(ConsoleError::ReadOnlyField("category".to_string()));
        }
        let schema = self.registry.resolve_form_schema(E::KIND, stored)?;
        let mut form = materialize(&schema, &entry.value)?;
        form.apply(input)?;
        self.submit_if_version(scope, form, Some(entry.version)).await
    }

    /// Remove the config entry, then clean up its runtime overlay.
    ///
    /// Cleanup failures are logged by the runtime store and do not fail the
    /// delete. Deleting an absent entity succeeds.
    pub async fn delete(&self, key: &str) -> Result<(), ConsoleError> {
        let removed = self.config.remove(key).await?;
        tracing::info!(kind = %E::KIND, key, removed, "entity deleted");
        if let Some(runtime_key) = E::runtime_cleanup_key(key) {
            self.runtime.remove(&runtime_key).await;
        }
        Ok(())
    }

    /// Ask the processing engine to reload the entity at `key`.
    pub async fn refresh(&self, key: &str) -> Result<(), ConsoleError> {
        self.config.refresh(key).await
    }

    /// Shared write path. `expected` of `None` skips the version check.
    async fn store(
        &self,
        scope: &Scope,
        mut form: EditableForm,
        expected: Option<Option<u64>>,
    ) -> Result<KeyedValue<EntityValue>, ConsoleError> {
        form.validate()?;
        let key = self.entity_key(scope, &form.serialize())?;
        self.assign_id(&key, &mut form, expected).await?;
        let value = form.submit()?;
        let stored = match expected {
            None => self.config.save(&key, &value).await?,
            Some(expected) => self.config.save_if_version(&key, &value, expected).await?,
        };
        tracing::info!(kind = %E::KIND, key = %stored.key, version = stored.version, "entity saved");
        Ok(stored)
    }

    /// Give the form an `id` if it has none: the stored entry's id when
    /// the key already exists, otherwise a fresh one from the sequence.
    async fn assign_id(
        &self,
        key: &str,
        form: &mut EditableForm,
        expected: Option<Option<u64>>,
    ) -> Result<(), ConsoleError> {
        if form_id(form).is_some() {
            return Ok(());
        }
        // A create that must not find an entry has nothing to inherit.
        let inherited = if expected == Some(None) {
            None
        } else {
            match self.config.find_one(key).await {
                Ok(entry) => entry.value.get(ID_FIELD).filter(|id| !id.is_null()).cloned(),
                Err(ConsoleError::NotFound(_)) => None,
                Err(e) => return Err(e),
            }
        };
        let id = match inherited {
            Some(id) => id,
            None => Value::from(self.config.transport().next_id().await?),
        };
        form.assign(ID_FIELD, id)?;
        Ok(())
    }

    fn entity_key(&self, scope: &Scope, value: &EntityValue) -> Result<String, ConsoleError> {
        let key = match value.get("key") {
            Some(Value::String(k)) if !k.is_empty() => k,
            _ => return Err(ConsoleError::InvalidKey("entity has no key".to_string())),
        };
        scope.entity_key(E::KIND, key)
    }
}

fn form_id(form: &EditableForm) -> Option<&Value> {
    match form.value(ID_FIELD)? {
        FormValue::Fixed(Some(id)) if !id.is_null() => Some(id),
        _ => None,
    }
}

/// The `category` of a stored entity, for kinds that have one.
fn stored_category<E: Entity>(value: &EntityValue) -> Result<Option<&str>, ConsoleError> {
    if !E::KIND.is_categorized() {
        return Ok(None);
    }
    value
        .get("category")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(Some)
        .ok_or(ConsoleError::MissingCategory(E::KIND))
}

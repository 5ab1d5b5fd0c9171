//! # CLI Command Implementations

use crate::api::{self, AppState};
use crate::client::{Address, Entity, HttpTransport, Sink, Stream, Task, Variable};
use crate::config::ConsoleConfig;
use crate::controller::Controller;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teleporter_core::primitives::MAX_VALUE_BYTES;
use teleporter_core::{
    ConsoleError, EntityKind, EntityValue, FieldDescriptor, FieldKind, FieldSchema, GroupSource,
    ItemKind, KeyedValue, Keyspace, SchemaRegistry, Scope,
};

/// Runs `$func::<Marker>(args..)` for the marker matching `$kind`.
macro_rules! with_entity {
    ($kind:expr, $func:ident ( $($arg:expr),* $(,)? )) => {
        match $kind {
            EntityKind::Address => $func::<Address>($($arg),*).await,
            EntityKind::Task => $func::<Task>($($arg),*).await,
            EntityKind::Stream => $func::<Stream>($($arg),*).await,
            EntityKind::Sink => $func::<Sink>($($arg),*).await,
            EntityKind::Variable => $func::<Variable>($($arg),*).await,
        }
    };
}

// =============================================================================
// OUTPUT
// =============================================================================

/// Output switches shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json_mode: bool,
    pub verbose: bool,
}

fn print_json(value: &impl Serialize) -> Result<(), ConsoleError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ConsoleError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn print_entries<V>(entries: &[KeyedValue<V>], out: Output) {
    for entry in entries {
        if out.verbose {
            println!("{}  v{}  {}", entry.key, entry.version, entry.timestamp);
        } else {
            println!("{}", entry.key);
        }
    }
}

// =============================================================================
// SETUP
// =============================================================================

fn registry(config: &ConsoleConfig) -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::with_version(config.schema_version))
}

fn connect(config: &ConsoleConfig) -> Result<HttpTransport, ConsoleError> {
    HttpTransport::new(config.url.clone(), config.api_key.clone())
}

fn controller<E: Entity>(
    config: &ConsoleConfig,
) -> Result<Controller<E, HttpTransport>, ConsoleError> {
    Ok(Controller::new(connect(config)?, registry(config)))
}

// =============================================================================
// FILE INPUT
// =============================================================================

/// Canonicalize an input path and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, ConsoleError> {
    let canonical = path.canonicalize().map_err(|e| {
        ConsoleError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(ConsoleError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    Ok(canonical)
}

/// Read a JSON object from `path`. Files larger than a stored value are refused.
pub fn read_entity_file(path: &Path) -> Result<EntityValue, ConsoleError> {
    let path = validate_file_path(path)?;
    let metadata = std::fs::metadata(&path)
        .map_err(|e| ConsoleError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_VALUE_BYTES as u64 {
        return Err(ConsoleError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_VALUE_BYTES
        )));
    }

    let text = std::fs::read_to_string(&path)
        .map_err(|e| ConsoleError::IoError(format!("Cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| {
        ConsoleError::SerializationError(format!("{} is not a JSON object: {}", path.display(), e))
    })
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the console service.
pub async fn cmd_serve(config: &ConsoleConfig) -> Result<(), ConsoleError> {
    let keyspace = match &config.server.database {
        Some(path) => Keyspace::with_redb(path)?,
        None => Keyspace::new(),
    };
    let settings = config.server_settings();
    let addr = config.bind_addr();

    println!("Teleporter Console Service Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", addr);
    println!("  Schemas:  {}", config.schema_version);
    match &config.server.database {
        Some(path) => println!("  Database: {} (redb)", path.display()),
        None => println!("  Database: in-memory"),
    }
    println!();
    println!("Endpoints:");
    println!("  GET    /health                 - Health check");
    println!("  GET    /{{space}}/entry          - Point lookup");
    println!("  POST   /{{space}}/entry          - Upsert");
    println!("  POST   /{{space}}/entry/atomic   - Compare-and-set upsert");
    println!("  DELETE /{{space}}/entry          - Delete");
    println!("  GET    /{{space}}/range          - Prefix listing");
    println!("  POST   /config/refresh         - Request engine reload");
    println!("  GET    /categories/{{kind}}      - Known categories");
    println!("  GET    /schema/{{kind}}          - Resolved form schema");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(keyspace, SchemaRegistry::with_version(config.schema_version));
    api::run_server(&addr, state, &settings).await
}

// =============================================================================
// REGISTRY COMMANDS
// =============================================================================

/// Summary of every kind's categories.
pub fn cmd_overview(config: &ConsoleConfig, out: Output) -> Result<(), ConsoleError> {
    let registry = registry(config);
    if out.json_mode {
        let kinds: serde_json::Map<String, serde_json::Value> = EntityKind::ALL
            .into_iter()
            .map(|kind| (kind.to_string(), serde_json::json!(registry.categories(kind))))
            .collect();
        return print_json(&serde_json::json!({
            "url": config.url,
            "schema_version": config.schema_version,
            "kinds": kinds,
        }));
    }

    println!("Teleporter Console");
    println!("==================");
    println!("Service: {}", config.url);
    println!("Schemas: {}", config.schema_version);
    println!();
    for kind in EntityKind::ALL {
        let categories = registry.categories(kind);
        if categories.is_empty() {
            println!("  {:<9} (no categories)", kind.as_str());
        } else {
            println!("  {:<9} {}", kind.as_str(), categories.join(", "));
        }
    }
    Ok(())
}

/// List the categories of one kind.
pub fn cmd_categories(config: &ConsoleConfig, out: Output, kind: &str) -> Result<(), ConsoleError> {
    let kind: EntityKind = kind.parse()?;
    let registry = registry(config);
    let categories = registry.categories(kind);

    if out.json_mode {
        return print_json(&api::CategoriesResponse {
            kind,
            version: registry.version(),
            categories: categories.iter().map(|c| (*c).to_string()).collect(),
        });
    }
    for category in categories {
        println!("{}", category);
    }
    Ok(())
}

/// Show the resolved form schema.
pub fn cmd_schema(
    config: &ConsoleConfig,
    out: Output,
    kind: &str,
    category: Option<&str>,
) -> Result<(), ConsoleError> {
    let kind: EntityKind = kind.parse()?;
    let registry = registry(config);
    let schema = registry.resolve_form_schema(kind, category)?;

    if out.json_mode {
        return print_json(&api::SchemaResponse {
            kind,
            category: category.map(String::from),
            version: registry.version(),
            fields: schema,
        });
    }
    print_schema(&schema, 0);
    Ok(())
}

fn kind_label(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "text",
        FieldKind::Number => "number",
        FieldKind::ReadOnly => "readonly",
        FieldKind::Multiline => "multiline",
        FieldKind::DynamicGroup => "map",
        FieldKind::FixedGroup(_) => "group",
        FieldKind::List(ItemKind::Text) => "list<text>",
        FieldKind::List(ItemKind::Group(_)) => "list<group>",
    }
}

fn print_field(field: &FieldDescriptor, depth: usize) {
    let mut line = format!("{}{} ({})", "  ".repeat(depth), field.key, kind_label(&field.kind));
    if field.required {
        line.push_str(" *");
    }
    if let Some(default) = &field.default {
        line.push_str(&format!(" = {}", default));
    }
    println!("{}", line);
}

fn print_schema(schema: &FieldSchema, depth: usize) {
    for field in schema.fields() {
        print_field(field, depth);
        match &field.kind {
            FieldKind::FixedGroup(GroupSource::Schema(nested))
            | FieldKind::List(ItemKind::Group(nested)) => print_schema(nested, depth + 1),
            _ => {}
        }
    }
}

// =============================================================================
// ENTITY COMMANDS
// =============================================================================

/// List entities within a namespace.
pub async fn cmd_list(
    config: &ConsoleConfig,
    out: Output,
    kind: &str,
    ns: &str,
    parents: &[String],
    with_runtime: bool,
) -> Result<(), ConsoleError> {
    let kind: EntityKind = kind.parse()?;
    let scope = Scope::nested(ns, parents.iter().cloned());

    if with_runtime {
        if kind == EntityKind::Variable {
            return list_variables_with_runtime(config, out, &scope).await;
        }
        tracing::warn!(%kind, "--with-runtime only applies to variables, ignoring");
    }
    with_entity!(kind, list_entities(config, out, &scope))
}

async fn list_entities<E: Entity>(
    config: &ConsoleConfig,
    out: Output,
    scope: &Scope,
) -> Result<(), ConsoleError> {
    let entries = controller::<E>(config)?.list(scope).await?;
    if out.json_mode {
        return print_json(&entries);
    }
    print_entries(&entries, out);
    println!("{} {}(s)", entries.len(), E::KIND);
    Ok(())
}

async fn list_variables_with_runtime(
    config: &ConsoleConfig,
    out: Output,
    scope: &Scope,
) -> Result<(), ConsoleError> {
    let rows = controller::<Variable>(config)?
        .list_with_runtime(scope)
        .await?;
    if out.json_mode {
        return print_json(&rows);
    }

    for row in &rows {
        let summary = variable_summary(&row.config.value);
        let runtime = match (&row.runtime, &row.runtime_error) {
            (_, Some(error)) => format!("error: {}", error),
            (Some(record), None) => serde_json::Value::Object(record.value.extra.clone()).to_string(),
            (None, None) => "-".to_string(),
        };
        println!("{}  {}  runtime={}", row.config.key, summary, runtime);
    }
    println!("{} variable(s)", rows.len());
    Ok(())
}

/// `name=... arguments={...}` of a stored variable.
fn variable_summary(value: &EntityValue) -> String {
    let name = value.get("name").and_then(|n| n.as_str()).unwrap_or("");
    let arguments = value
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| serde_json::Value::Object(EntityValue::new()));
    format!("name={} arguments={}", name, arguments)
}

/// Show one entity.
pub async fn cmd_get(
    config: &ConsoleConfig,
    out: Output,
    kind: &str,
    key: &str,
) -> Result<(), ConsoleError> {
    let kind: EntityKind = kind.parse()?;
    with_entity!(kind, get_entity(config, out, key))
}

async fn get_entity<E: Entity>(
    config: &ConsoleConfig,
    out: Output,
    key: &str,
) -> Result<(), ConsoleError> {
    let entry = controller::<E>(config)?.config().find_one(key).await?;
    if out.json_mode {
        return print_json(&entry);
    }
    println!("Key:       {}", entry.key);
    println!("Version:   {}", entry.version);
    println!("Timestamp: {}", entry.timestamp);
    print_json(&entry.value)
}

/// Create or update an entity from a JSON file.
pub async fn cmd_apply(
    config: &ConsoleConfig,
    out: Output,
    kind: &str,
    file: &Path,
    ns: &str,
    parents: &[String],
    category: Option<&str>,
) -> Result<(), ConsoleError> {
    let kind: EntityKind = kind.parse()?;
    let input = read_entity_file(file)?;
    let scope = Scope::nested(ns, parents.iter().cloned());
    with_entity!(kind, apply_entity(config, out, &scope, category, &input))
}

async fn apply_entity<E: Entity>(
    config: &ConsoleConfig,
    out: Output,
    scope: &Scope,
    category: Option<&str>,
    input: &EntityValue,
) -> Result<(), ConsoleError> {
    let category = category.or_else(|| {
        E::KIND
            .is_categorized()
            .then(|| input.get("category").and_then(|c| c.as_str()))
            .flatten()
    });
    let stored = controller::<E>(config)?
        .apply(scope, category, input)
        .await?;

    if out.json_mode {
        return print_json(&stored);
    }
    println!("Saved {} (version {})", stored.key, stored.version);
    Ok(())
}

/// Delete an entity and clean up its runtime overlay.
pub async fn cmd_delete(
    config: &ConsoleConfig,
    out: Output,
    kind: &str,
    key: &str,
) -> Result<(), ConsoleError> {
    let kind: EntityKind = kind.parse()?;
    with_entity!(kind, delete_entity(config, out, key))
}

async fn delete_entity<E: Entity>(
    config: &ConsoleConfig,
    out: Output,
    key: &str,
) -> Result<(), ConsoleError> {
    controller::<E>(config)?.delete(key).await?;
    if out.json_mode {
        return print_json(&serde_json::json!({ "deleted": key }));
    }
    println!("Deleted {}", key);
    Ok(())
}

/// Ask the processing engine to reload an entity.
pub async fn cmd_refresh(
    config: &ConsoleConfig,
    out: Output,
    kind: &str,
    key: &str,
) -> Result<(), ConsoleError> {
    let kind: EntityKind = kind.parse()?;
    with_entity!(kind, refresh_entity(config, out, key))
}

async fn refresh_entity<E: Entity>(
    config: &ConsoleConfig,
    out: Output,
    key: &str,
) -> Result<(), ConsoleError> {
    controller::<E>(config)?.refresh(key).await?;
    if out.json_mode {
        return print_json(&api::RefreshResponse {
            key: key.to_string(),
        });
    }
    println!("Refresh requested for {}", key);
    Ok(())
}

// =============================================================================
// RUNTIME COMMANDS
// =============================================================================

/// Show the tasks that hold an address.
pub async fn cmd_owners(
    config: &ConsoleConfig,
    out: Output,
    ns: &str,
    address: &str,
) -> Result<(), ConsoleError> {
    let owners = controller::<Address>(config)?.owners(ns, address).await?;
    if out.json_mode {
        return print_json(&owners);
    }
    if owners.is_empty() {
        println!("{} has no owners", address);
        return Ok(());
    }
    for record in &owners {
        println!("{}: {}", record.key, record.value.owner_keys.join(", "));
    }
    Ok(())
}

/// Show the runtime value of a variable.
pub async fn cmd_runtime(config: &ConsoleConfig, out: Output, key: &str) -> Result<(), ConsoleError> {
    let record = controller::<Variable>(config)?.runtime(key).await?;
    if out.json_mode {
        return print_json(&record);
    }
    match record {
        Some(record) => {
            println!("Key:       {}", record.key);
            println!("Version:   {}", record.version);
            println!("Timestamp: {}", record.timestamp);
            print_json(&record.value)
        }
        None => {
            println!("{} has no runtime value", key);
            Ok(())
        }
    }
}

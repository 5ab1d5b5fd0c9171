//! # Teleporter Console CLI
//!
//! ## Available Commands
//!
//! - `serve` - Start the console service
//! - `categories` - List the categories of an entity kind
//! - `schema` - Show the resolved form schema of a kind/category
//! - `list` - List entities of a kind within a namespace
//! - `get` - Show one entity
//! - `apply` - Create or update an entity from a JSON file
//! - `delete` - Delete an entity (and its runtime overlay)
//! - `refresh` - Ask the processing engine to reload an entity
//! - `owners` - Show the tasks holding an address
//! - `runtime` - Show the runtime value of a variable
//!
//! Every command but `serve`, `categories` and `schema` talks to a running
//! console service at `--url`.

mod commands;

use crate::config::ConsoleConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use teleporter_core::ConsoleError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Teleporter Console - schema-driven configuration for the Teleporter engine
#[derive(Parser, Debug)]
#[command(name = "teleporter-console")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Show versions and timestamps in listings
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ./teleporter.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Console service URL
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    /// API key sent to (or enforced by) the console service
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Client schema table generation (v1, v2)
    #[arg(short = 'S', long, global = true)]
    pub schema_version: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the console service
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// redb database file (in-memory when omitted)
        #[arg(short = 'D', long)]
        database: Option<PathBuf>,
    },

    /// List the categories of an entity kind
    Categories {
        /// Entity kind (address, task, stream, sink, variable)
        kind: String,
    },

    /// Show the resolved form schema
    Schema {
        /// Entity kind
        kind: String,

        /// Category (address and sink only)
        #[arg(short = 'C', long)]
        category: Option<String>,
    },

    /// List entities within a namespace
    List {
        /// Entity kind
        kind: String,

        /// Namespace
        #[arg(short, long)]
        ns: String,

        /// Parent keys, outermost first (stream: task; sink: task, stream)
        #[arg(long = "parent")]
        parents: Vec<String>,

        /// Join each variable with its runtime value
        #[arg(short = 'R', long)]
        with_runtime: bool,
    },

    /// Show one entity
    Get {
        /// Entity kind
        kind: String,

        /// Full key, e.g. /address/ns1/kafka-in
        key: String,
    },

    /// Create or update an entity from a JSON object
    Apply {
        /// Entity kind
        kind: String,

        /// JSON file holding the entity fields (must include `key`)
        #[arg(short, long)]
        file: PathBuf,

        /// Namespace
        #[arg(short, long)]
        ns: String,

        /// Parent keys, outermost first
        #[arg(long = "parent")]
        parents: Vec<String>,

        /// Category (defaults to the file's `category`)
        #[arg(short = 'C', long)]
        category: Option<String>,
    },

    /// Delete an entity
    Delete {
        /// Entity kind
        kind: String,

        /// Full key
        key: String,
    },

    /// Ask the processing engine to reload an entity
    Refresh {
        /// Entity kind
        kind: String,

        /// Full key
        key: String,
    },

    /// Show the tasks that hold an address
    Owners {
        /// Namespace
        #[arg(short, long)]
        ns: String,

        /// Address key (last path segment)
        address: String,
    },

    /// Show the runtime value of a variable
    Runtime {
        /// Full variable key
        key: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve the layered configuration: file, environment, then flags.
pub fn resolve_config(cli: &Cli) -> Result<ConsoleConfig, ConsoleError> {
    let mut config = ConsoleConfig::load(cli.config.as_deref())?;
    config.apply_process_env()?;

    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    if let Some(key) = &cli.api_key {
        config.api_key = Some(key.clone()).filter(|k| !k.is_empty());
    }
    if let Some(version) = &cli.schema_version {
        config.schema_version = version.parse()?;
    }
    if let Some(Commands::Serve {
        host,
        port,
        database,
    }) = &cli.command
    {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
        if let Some(database) = database {
            config.server.database = Some(database.clone());
        }
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ConsoleError> {
    let config = resolve_config(&cli)?;
    let out = Output {
        json_mode: cli.json_mode,
        verbose: cli.verbose,
    };

    match cli.command {
        Some(Commands::Serve { .. }) => cmd_serve(&config).await,
        Some(Commands::Categories { kind }) => cmd_categories(&config, out, &kind),
        Some(Commands::Schema { kind, category }) => {
            cmd_schema(&config, out, &kind, category.as_deref())
        }
        Some(Commands::List {
            kind,
            ns,
            parents,
            with_runtime,
        }) => cmd_list(&config, out, &kind, &ns, &parents, with_runtime).await,
        Some(Commands::Get { kind, key }) => cmd_get(&config, out, &kind, &key).await,
        Some(Commands::Apply {
            kind,
            file,
            ns,
            parents,
            category,
        }) => cmd_apply(&config, out, &kind, &file, &ns, &parents, category.as_deref()).await,
        Some(Commands::Delete { kind, key }) => cmd_delete(&config, out, &kind, &key).await,
        Some(Commands::Refresh { kind, key }) => cmd_refresh(&config, out, &kind, &key).await,
        Some(Commands::Owners { ns, address }) => cmd_owners(&config, out, &ns, &address).await,
        Some(Commands::Runtime { key }) => cmd_runtime(&config, out, &key).await,
        None => {
            // No subcommand: show what the registry knows
            cmd_overview(&config, out)
        }
    }
}

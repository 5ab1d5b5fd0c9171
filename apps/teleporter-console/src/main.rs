//! # teleporter-console
//!
//! ## Usage
//!
//! ```bash
//! # Start the console service
//! teleporter-console serve --host 0.0.0.0 --port 8080 --database console.redb
//!
//! # Registry
//! teleporter-console categories address
//! teleporter-console schema sink --category kafka
//!
//! # Entities (against the service at --url)
//! teleporter-console apply address --ns ns1 --category kafka_consumer -f kafka-in.json
//! teleporter-console list stream --ns ns1 --parent task1
//! teleporter-console owners --ns ns1 kafka-in
//! teleporter-console delete address /address/ns1/kafka-in
//! ```

use clap::Parser;
use teleporter_console::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // TELEPORTER_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("TELEPORTER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "teleporter_console=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  ╔╦╗╔═╗╦  ╔═╗╔═╗╔═╗╦═╗╔╦╗╔═╗╦═╗
   ║ ║╣ ║  ║╣ ╠═╝║ ║╠╦╝ ║ ║╣ ╠╦╝
   ╩ ╚═╝╩═╝╚═╝╩  ╚═╝╩╚═ ╩ ╚═╝╩╚═

  Teleporter Console v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}

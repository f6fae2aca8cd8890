//! # confgraph
//!
//! Command-line front end for the confgraph module resolver.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 apps/confgraph (THE BINARY)                 │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌────────────────┐   │
//! │  │    CLI      │    │  Settings   │    │   Document     │   │
//! │  │   (clap)    │    │   (toml)    │    │  collaborator  │   │
//! │  └──────┬──────┘    └──────┬──────┘    └───────┬────────┘   │
//! │         └──────────────────┼───────────────────┘            │
//! │                            ▼                                │
//! │                   ┌────────────────┐                        │
//! │                   │ confgraph-core │                        │
//! │                   │ (THE RESOLVER) │                        │
//! │                   └────────────────┘                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! confgraph list
//! confgraph plan web/server
//! confgraph build web/server --output config.json
//! confgraph build --inline root.toml --lenient
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // CONFGRAPH_LOG_FORMAT=json enables machine-parseable logs. Logs go to
    // stderr; stdout carries command output.
    let log_format = std::env::var("CONFGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "confgraph=warn,confgraph_core=warn".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
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

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

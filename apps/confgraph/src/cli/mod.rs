//! # confgraph CLI Module
//!
//! ## Available Commands
//!
//! - `list` - Show discovered modules and their dependencies
//! - `plan` - Show the resolved order and the steps of each phase
//! - `build` - Run the pipeline and emit the configuration document

mod commands;

use clap::{Args, Parser, Subcommand};
use confgraph::AppError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// confgraph - configuration from dependency-ordered modules
///
/// Discovers module manifests on a search path, resolves the modules a root
/// needs, and builds one JSON document from them.
#[derive(Parser, Debug)]
#[command(name = "confgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Settings file (default: ./confgraph.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory to search for module manifests (repeatable, replaces the settings)
    #[arg(short = 'S', long = "search-path", global = true)]
    pub search_path: Vec<PathBuf>,

    /// Manifest base name to look for in each directory
    #[arg(short, long, global = true)]
    pub resource: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Suppress summary output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// The module a command starts from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct RootArgs {
    /// Name of a discovered module
    pub root: Option<String>,

    /// File holding a single module definition to use as the root (JSON or TOML)
    #[arg(short, long, value_name = "FILE")]
    pub inline: Option<PathBuf>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List discovered modules
    List,

    /// Show the build plan for a root without running it
    Plan {
        #[command(flatten)]
        root: RootArgs,
    },

    /// Build the configuration document for a root
    Build {
        #[command(flatten)]
        root: RootArgs,

        /// Return the document even when validation finds problems
        #[arg(long)]
        lenient: bool,

        /// Write the document to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), AppError> {
    let settings = load_settings(cli.config.as_deref(), cli.search_path, cli.resource)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::List => cmd_list(&settings, json_mode),
        Commands::Plan { root } => cmd_plan(&settings, &root, json_mode),
        Commands::Build {
            root,
            lenient,
            output,
        } => cmd_build(
            &settings,
            &root,
            BuildOptions {
                strict: settings.strict && !lenient,
                output,
                json_mode,
                quiet: cli.quiet,
            },
        ),
    }
}

//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Airship - Keep files identical across several storage locations
#[derive(Parser, Debug)]
#[command(name = "airship")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress human-readable output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Reconcile every item declared in the manifest
    ///
    /// Examples:
    ///   airship sync                         # Use ./airship.toml
    ///   airship sync --manifest saves.yaml   # Explicit manifest
    ///   airship sync --dry-run --json        # Plan only, machine-readable
    Sync {
        /// Manifest to load (TOML, JSON or YAML)
        #[arg(short, long, env = "AIRSHIP_MANIFEST")]
        manifest: Option<PathBuf>,

        /// Preview writes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a manifest and list its replicas and items
    Validate {
        /// Manifest to load (TOML, JSON or YAML)
        #[arg(short, long, env = "AIRSHIP_MANIFEST")]
        manifest: Option<PathBuf>,
    },
}

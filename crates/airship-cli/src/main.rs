//! Airship CLI
//!
//! Reconciles the items declared in a manifest across its replicas.

mod cli;
mod commands;
mod error;

use std::io::IsTerminal;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(verbose)
        .try_init();
    tracing::debug!("Verbose mode enabled");
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let output = commands::Output { quiet: cli.quiet };

    match cli.command {
        Commands::Sync {
            manifest,
            dry_run,
            json,
        } => commands::run_sync(&cwd, manifest, dry_run, json, output),
        Commands::Validate { manifest } => commands::run_validate(&cwd, manifest, output),
    }
}

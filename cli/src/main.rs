//! `spacecopy` binary.
//!
//! ## Commands
//!
//! - `spacecopy migrate [--config PATH] [--on-conflict MODE] [--no-attachments] [--no-labels] [--page-limit N]`
//! - `spacecopy check-config [--config PATH]`

mod config_cmd;
mod migrate_cmd;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config_cmd::CheckConfigArgs;
use crate::migrate_cmd::MigrateArgs;

/// Copy a page hierarchy, with labels and attachments, between two content
/// service spaces.
#[derive(Debug, Parser)]
#[command(name = "spacecopy", version, about)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one migration from the source space to the destination space.
    Migrate(MigrateArgs),
    /// Load and validate configuration, then print the effective settings.
    CheckConfig(CheckConfigArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // stdout carries the run summary; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Command::Migrate(args) => args.run().await,
        Command::CheckConfig(args) => args.run(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

//! # careins CLI entry point
//!
//! Parses command-line arguments, initializes logging, resolves
//! configuration, and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use careins_cli::config::CliConfig;
use careins_cli::round::{build_service, run_round, RoundArgs};
use careins_cli::table::run_table;

/// Care insurance back office CLI.
///
/// Operates caregiving rounds stored as local JSON records and prints the
/// caregiving progress transition table.
#[derive(Parser, Debug)]
#[command(name = "careins", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding round records (default: .careins/rounds).
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Caregiving round lifecycle (open, assign, start, complete, etc.).
    Round(RoundArgs),

    /// Print which operations each progressing status accepts.
    Table,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("careins CLI starting");

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("ERROR: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<u8> {
    match &cli.command {
        Commands::Round(args) => {
            let config = CliConfig::load(cli.config.as_deref())?;
            let state_dir = config.state_dir(cli.state_dir.as_deref());
            tracing::debug!(state_dir = %state_dir.display(), "resolved state directory");
            let service = build_service(&state_dir, config.service_config()?);
            run_round(args, &service)
        }
        Commands::Table => run_table(),
    }
}

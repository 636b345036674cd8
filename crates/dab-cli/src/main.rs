//! # dab CLI Entry Point
//!
//! Parses arguments, initializes tracing, and dispatches to subcommands.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use dab_backend::BackendConfig;
use tracing_subscriber::EnvFilter;

use dab_cli::inspect::{run_inspect, InspectArgs};
use dab_cli::migrate::{run_migrate, MigrateArgs};

/// DA bridge operator tooling.
#[derive(Parser, Debug)]
#[command(name = "dab", version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Backend configuration file (JSON). Defaults to `DA_*` environment
    /// variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy sequenced batches from a DAC node into the fallback store.
    Migrate(MigrateArgs),
    /// Decode a DA message envelope or sequencing calldata.
    Inspect(InspectArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    match cli.command {
        Commands::Inspect(args) => run_inspect(&args),
        Commands::Migrate(args) => {
            let config = load_config(cli.config.as_ref())?;
            let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
            runtime.block_on(run_migrate(&args, &config))
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<BackendConfig> {
    match path {
        Some(path) => BackendConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => BackendConfig::from_env().context("invalid DA_* environment"),
    }
}

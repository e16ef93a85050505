//! Fanout CLI - mirror a local directory to multiple remote destinations
//!
//! Provides commands for:
//! - Running the watch-and-sync daemon
//! - Forcing a single reconciliation cycle
//! - Inspecting the tracked state

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{run::RunCommand, status::StatusCommand, sync::SyncCommand};

#[derive(Debug, Parser)]
#[command(name = "fanout", version, about = "Multi-destination directory mirror")]
pub struct Cli {
    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Watch the local tree and reconcile continuously
    Run(RunCommand),
    /// Run one reconciliation cycle and exit
    Sync(SyncCommand),
    /// Show tracked state and per-transport coverage
    Status(StatusCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let config_path = cli.config;

    match cli.command {
        Commands::Run(cmd) => cmd.execute(config_path.as_deref()).await,
        Commands::Sync(cmd) => cmd.execute(config_path.as_deref()).await,
        Commands::Status(cmd) => cmd.execute(config_path.as_deref()).await,
    }
}

//! RdbView CLI - command-line interface for browsing and extracting archives

pub mod commands;
pub mod progress;

use std::process::ExitCode;

use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "rdbview")]
#[command(about = "RdbView: browse RDB archives and extract entries", long_about = None)]
#[command(version)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Run the RdbView CLI
pub fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    cli.command.execute()
}

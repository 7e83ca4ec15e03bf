//! cueplay CLI - scenario runner for the embedded player adapter
//!
//! Features:
//! - Replays JSON scenarios against a simulated embedded player
//! - Virtual or real-time clock for polling timers
//! - Player state table

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// cueplay CLI - Embedded player adapter toolkit
#[derive(Parser)]
#[command(name = "cueplay-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Drive the cueplay player adapter through scripted scenarios", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario against a simulated player
    Run {
        /// Path to the scenario JSON file
        scenario: PathBuf,

        /// Player configuration JSON, overrides the scenario's own
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Sleep through `advance` steps instead of jumping the clock
        #[arg(long)]
        realtime: bool,

        /// Mount target of the player
        #[arg(short, long, default_value = "player")]
        target: String,
    },

    /// Show the player state table
    States,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();
    cueplay_core::init();

    match cli.command {
        Commands::Run { scenario, config, realtime, target } => {
            commands::run(&scenario, config.as_deref(), realtime, &target, &cli.format).await?;
        }
        Commands::States => {
            commands::states(&cli.format);
        }
    }

    Ok(())
}

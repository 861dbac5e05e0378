//! netsnap - network device snapshot capture
//!
//! Runs declarative command and RPC test cases against devices and saves
//! every reply as a snapshot file for later comparison.

use clap::Parser;
use commands::Commands;
use netsnap::{cli, commands, common::logging};

#[derive(Parser)]
#[command(name = "netsnap", about = "Capture network device snapshots")]
#[command(version, long_about = None)]
struct Cli {
    /// Also write logs to the netsnap data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Hold the guard until exit so buffered file logs get flushed
    let _log_guard = if cli.log_file {
        logging::init_with_file().map(|(path, guard)| {
            tracing::info!("Writing logs to {}", path.display());
            guard
        })
    } else {
        logging::init_cli();
        None
    };

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

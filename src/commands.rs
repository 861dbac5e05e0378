//! CLI command definitions
//!
//! Defines the clap commands for the netsnap CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Take a snapshot of every host in the main config
    Snap {
        /// Snapshot tag used in file names, or an existing file to overwrite
        tag: String,

        /// Main config file (hosts, tests, sqlite)
        #[arg(long, short = 'f')]
        file: PathBuf,

        /// Directory of recorded replies, one subdirectory per host
        #[arg(long)]
        replay: PathBuf,

        /// Snapshot only this host instead of the hosts in the main config
        #[arg(long)]
        host: Option<String>,

        /// Override the snapshot directory from config.toml
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,

        /// Print per-host reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create snapshots/ and configs/ folders with a sample main config
    Init {
        /// Overwrite existing sample files
        #[arg(long)]
        force: bool,
    },
}

//! CLI argument definitions using clap
//!
//! Commands:
//! - brickdb load --config <path>
//! - brickdb status --config <path>
//! - brickdb report --config <path>
//! - brickdb inventory --config <path> --set <set_num>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// brickdb - versioned brick catalog store
#[derive(Parser, Debug)]
#[command(name = "brickdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebuild the catalog from the dataset directory if its version changed
    Load {
        /// Path to configuration file
        #[arg(long, default_value = "./brickdb.json")]
        config: PathBuf,

        /// Rebuild even if the dataset version is already served
        #[arg(long)]
        force: bool,
    },

    /// Show the served generation and dataset version
    Status {
        /// Path to configuration file
        #[arg(long, default_value = "./brickdb.json")]
        config: PathBuf,
    },

    /// Print the rejection report of the last load
    Report {
        /// Path to configuration file
        #[arg(long, default_value = "./brickdb.json")]
        config: PathBuf,
    },

    /// Print a set's part totals, nested sets and minifigs multiplied out
    Inventory {
        /// Path to configuration file
        #[arg(long, default_value = "./brickdb.json")]
        config: PathBuf,

        /// Set number, e.g. 10179-1
        #[arg(long = "set")]
        set_num: String,

        /// Count spare parts
        #[arg(long)]
        include_spares: bool,

        /// Leave minifig parts out
        #[arg(long)]
        exclude_minifigs: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

//! CLI module for brickdb
//!
//! Provides command-line interface for:
//! - load: rebuild the catalog when the dataset version changed
//! - status: served generation and tracked version
//! - report: rejection report of the last load
//! - inventory: a set's rolled-up part totals

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{inventory, load, report, run, run_command, status, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};

//! brickdb CLI entry point
//!
//! Parses arguments, dispatches to the CLI module, exits non-zero on
//! failure. The error itself is already on stdout as the command's JSON
//! response. Everything else lives in `cli`.

use brickdb::cli;

fn main() {
    if cli::run().is_err() {
        std::process::exit(1);
    }
}

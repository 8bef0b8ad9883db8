//! # Flatpak Cargo Updater CLI
//!
//! This is the binary entry point for the `flatpak-cargo-updater` tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Running the update pipeline.
//! - Turning failures into a diagnostic on stderr and an exit code that
//!   matches the external command that failed.
//!
//! The pipeline itself lives in the library crate; the binary is a thin
//! wrapper around it.

mod cli;

use std::process::ExitCode;

use clap::Parser;

use flatpak_cargo_updater::error::Error;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err.downcast_ref::<Error>().map_or(1, Error::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

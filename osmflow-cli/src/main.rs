//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use osmflow_cli::{CliError, run};

fn main() {
    match run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("osmflow: {err}");
            std::process::exit(1);
        }
    }
}

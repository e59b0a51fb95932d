//! Command-line interface for streaming OSM PBF files through osmflow.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use log::{LevelFilter, debug};
use std::{io, str::FromStr};

mod apply;
mod error;
mod fs;

pub use apply::ApplySummary;
pub use error::CliError;

use apply::{ApplyArgs, resolve_apply_config, run_apply, write_summary};

pub(crate) const ARG_OSM_PBF: &str = "osm-pbf";
pub(crate) const ARG_INDEX: &str = "index";
pub(crate) const ARG_CALLBACKS: &str = "callbacks";
pub(crate) const ARG_LOCATIONS: &str = "locations";
pub(crate) const ENV_OSM_PBF: &str = "OSMFLOW_CMDS_APPLY_OSM_PBF";

/// Run the osmflow CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when arguments, configuration or the input file are
/// invalid, or when the run itself fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging(cli.log_level.as_deref())?;
    match cli.command {
        Command::Apply(args) => {
            let config = resolve_apply_config(args)?;
            debug!("Resolved apply configuration: {config:?}");
            let summary = run_apply(&config)?;
            write_summary(&summary, io::stdout().lock())?;
        }
    }
    Ok(())
}

fn init_logging(level: Option<&str>) -> Result<(), CliError> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        let filter = LevelFilter::from_str(level).map_err(|_| CliError::InvalidLogLevel {
            level: level.to_owned(),
        })?;
        builder.filter_level(filter);
    }
    builder.try_init().map_err(CliError::Logging)
}

#[derive(Debug, Parser)]
#[command(
    name = "osmflow",
    about = "Stream OpenStreetMap PBF files through feature callbacks",
    version
)]
struct Cli {
    /// Log level (error, warn, info, debug, trace); defaults to `RUST_LOG`.
    #[arg(long, global = true, value_name = "level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Dispatch a PBF file to counting callbacks and print a JSON summary.
    Apply(ApplyArgs),
}

#[cfg(test)]
mod tests;

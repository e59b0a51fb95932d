//! Error types emitted by the osmflow CLI.
//!
//! Keep this error type reasonably small, as every CLI helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use osmflow_core::{ApplyError, UnknownIndexVariant};
use osmflow_data::PbfError;
use thiserror::Error;

/// Errors emitted by the osmflow CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// The `--log-level` value is not a level name.
    #[error("invalid log level {level:?}")]
    InvalidLogLevel {
        /// Value supplied on the command line.
        level: String,
    },
    /// A logger was already installed.
    #[error("failed to initialise logging: {0}")]
    Logging(#[source] log::SetLoggerError),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable consulted for the flag.
        env: &'static str,
    },
    /// The `--index` value names no location index.
    #[error(transparent)]
    InvalidIndex(#[from] UnknownIndexVariant),
    /// The `--callbacks` list contains an unknown feature kind.
    #[error("unknown callback {name:?}; expected node, way, relation, changeset or area")]
    UnknownCallback {
        /// Offending list entry.
        name: String,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Flag naming the path.
        field: &'static str,
        /// Path that was checked.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Flag naming the path.
        field: &'static str,
        /// Path that was checked.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag naming the path.
        field: &'static str,
        /// Path that was checked.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Reading the file or a callback failed.
    #[error("failed to apply callbacks: {0}")]
    Apply(#[from] ApplyError<PbfError>),
    /// Serializing the run summary failed.
    #[error("failed to serialize run summary: {0}")]
    SerializeSummary(#[source] serde_json::Error),
    /// Writing the run summary failed.
    #[error("failed to write run summary: {0}")]
    WriteSummary(#[source] std::io::Error),
}

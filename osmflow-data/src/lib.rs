//! OSM PBF input for the osmflow dispatch engine.
//!
//! Responsibilities:
//! - Read `.osm.pbf` files as restartable [`osmflow_core::FeatureSource`]
//!   sessions.
//! - Expose [`apply_file`], the run entry point that plans from the filled
//!   callback slots and dispatches a file through them.
//!
//! Boundaries:
//! - Planning, stages and dispatch live in `osmflow-core`.
//! - Decoding is single-threaded and lazy: one primitive block is held in
//!   memory at a time.

use std::path::Path;

use osmflow_core::{ApplyError, ApplyOptions, ApplyReport, Callbacks, apply_source};

mod reader;

pub use reader::{PbfError, PbfSession, PbfSource};

/// Stream the PBF file at `path` through `callbacks`.
///
/// Only the kinds the callbacks handle are read. With `options.locations`
/// set, or an area callback registered, way node references are resolved
/// against a location index. Registering an area callback reads the file
/// twice: once for relations, once for everything else.
///
/// # Errors
/// Returns [`ApplyError::Source`] when the file cannot be opened or decoded
/// and [`ApplyError::Callback`] when a callback fails. Missing node
/// locations and incomplete multipolygons are not errors.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
/// use osmflow_core::{ApplyOptions, Callbacks};
/// use osmflow_data::apply_file;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut buildings = 0_u64;
/// let callbacks = Callbacks::new().on_area(|area| {
///     if area.tags.contains_key("building") {
///         buildings += 1;
///     }
///     Ok(())
/// });
/// apply_file(Path::new("berlin.osm.pbf"), ApplyOptions::default(), callbacks)?;
/// println!("{buildings} buildings");
/// # Ok(())
/// # }
/// ```
pub fn apply_file(
    path: &Path,
    options: ApplyOptions,
    callbacks: Callbacks<'_>,
) -> Result<ApplyReport, ApplyError<PbfError>> {
    apply_source(&PbfSource::new(path), options, callbacks)
}

#[cfg(test)]
mod tests;

//! OSM PBF feature source.

use std::path::PathBuf;

use log::debug;
use osmflow_core::{FeatureKinds, FeatureSource};
use osmpbf::BlobReader;
use thiserror::Error;

mod convert;
mod session;

pub use session::PbfSession;

/// Errors raised while reading an OSM PBF file.
#[derive(Debug, Error)]
pub enum PbfError {
    /// The file could not be opened.
    #[error("failed to open OSM PBF file at {path:?}")]
    Open {
        /// Underlying reader error.
        #[source]
        source: osmpbf::Error,
        /// File being opened.
        path: PathBuf,
    },
    /// A blob could not be read or decoded.
    #[error("failed to decode OSM PBF data at {path:?}")]
    Decode {
        /// Underlying reader error.
        #[source]
        source: osmpbf::Error,
        /// File being decoded.
        path: PathBuf,
    },
}

/// [`FeatureSource`] over an OSM PBF file on disk.
///
/// Every [`FeatureSource::open`] reopens the file, so area assembly can read
/// it twice. Nodes and dense nodes are both yielded as
/// [`osmflow_core::Node`]. The format carries no changesets, so none are
/// ever yielded.
///
/// # Examples
/// ```no_run
/// use osmflow_core::{FeatureKind, FeatureSource};
/// use osmflow_data::PbfSource;
///
/// # fn main() -> Result<(), osmflow_data::PbfError> {
/// let source = PbfSource::new("berlin.osm.pbf");
/// let mut ways = 0_u64;
/// for feature in source.open(FeatureKind::Way.into())? {
///     feature?;
///     ways += 1;
/// }
/// println!("{ways} ways");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbfSource {
    path: PathBuf,
}

impl PbfSource {
    /// Read features from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeatureSource for PbfSource {
    type Error = PbfError;
    type Session = PbfSession;

    fn open(&self, kinds: FeatureKinds) -> Result<Self::Session, Self::Error> {
        let blobs = BlobReader::from_path(&self.path).map_err(|source| PbfError::Open {
            source,
            path: self.path.clone(),
        })?;
        debug!("Opened {:?} for kinds {kinds:?}", self.path);
        Ok(PbfSession::new(&self.path, kinds, blobs))
    }
}

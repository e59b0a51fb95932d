//! Feature stream reader seam.
//!
//! The engine never knows how features are stored. It asks a
//! [`FeatureSource`] for a session restricted to some kinds and consumes the
//! session by value; dropping the session releases whatever it holds.

use std::error::Error;

use crate::feature::{Feature, FeatureKinds};

/// Opens restartable feature stream sessions over one dataset.
///
/// Each call to [`FeatureSource::open`] starts a fresh session from the
/// beginning of the dataset, yielding only the requested kinds in storage
/// order. Area assembly opens two sessions one after the other, so sources
/// must support reopening.
pub trait FeatureSource {
    /// Failure to open or read the dataset.
    type Error: Error + Send + Sync + 'static;

    /// A lazy, forward-only sequence of features.
    type Session: Iterator<Item = Result<Feature, Self::Error>>;

    /// Start a new session yielding only `kinds`.
    ///
    /// An empty `kinds` set must yield nothing without reading any data.
    ///
    /// # Errors
    /// Returns an error when the dataset cannot be opened.
    fn open(&self, kinds: FeatureKinds) -> Result<Self::Session, Self::Error>;
}

impl<S> FeatureSource for &S
where
    S: FeatureSource + ?Sized,
{
    type Error = S::Error;
    type Session = S::Session;

    fn open(&self, kinds: FeatureKinds) -> Result<Self::Session, Self::Error> {
        (**self).open(kinds)
    }
}

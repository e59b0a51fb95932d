//! In-memory [`FeatureSource`] and feature builders used by unit, doc and
//! behaviour tests.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use geo::Coord;
use thiserror::Error;

use crate::{
    feature::{Changeset, Feature, FeatureKinds, Member, Node, Relation, Tags, Way},
    source::FeatureSource,
};

/// Errors raised by [`MemorySource`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemorySourceError {
    /// The source was built with [`MemorySource::unavailable`].
    #[error("dataset is unavailable")]
    Unavailable,
    /// The session was cut short by [`MemorySource::failing_after`].
    #[error("stream interrupted after {0} features")]
    Interrupted(usize),
}

/// Feature source backed by a vector.
///
/// Every open is recorded so tests can assert which kinds were requested,
/// and live sessions are counted so tests can assert they were released.
#[derive(Debug, Default)]
pub struct MemorySource {
    features: Vec<Feature>,
    opened: RefCell<Vec<FeatureKinds>>,
    live: Rc<Cell<usize>>,
    fail_after: Option<usize>,
    unavailable: bool,
}

impl MemorySource {
    /// Create a source yielding `features` in order.
    pub fn new<I>(features: I) -> Self
    where
        I: IntoIterator<Item = Feature>,
    {
        Self {
            features: features.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Make every session fail once it has yielded `count` features.
    #[must_use]
    pub const fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Make every open fail.
    #[must_use]
    pub const fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Kinds requested by each successful open, in order.
    #[must_use]
    pub fn opened(&self) -> Vec<FeatureKinds> {
        self.opened.borrow().clone()
    }

    /// Sessions opened and not yet dropped.
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.live.get()
    }
}

impl FeatureSource for MemorySource {
    type Error = MemorySourceError;
    type Session = MemorySession;

    fn open(&self, kinds: FeatureKinds) -> Result<Self::Session, Self::Error> {
        if self.unavailable {
            return Err(MemorySourceError::Unavailable);
        }
        self.opened.borrow_mut().push(kinds);
        self.live.set(self.live.get().saturating_add(1));
        let features: Vec<Feature> = self
            .features
            .iter()
            .filter(|feature| kinds.contains(feature.kind()))
            .cloned()
            .collect();
        Ok(MemorySession {
            features: features.into_iter(),
            yielded: 0,
            fail_after: self.fail_after,
            failed: false,
            live: Rc::clone(&self.live),
        })
    }
}

/// Session returned by [`MemorySource::open`].
#[derive(Debug)]
pub struct MemorySession {
    features: std::vec::IntoIter<Feature>,
    yielded: usize,
    fail_after: Option<usize>,
    failed: bool,
    live: Rc<Cell<usize>>,
}

impl Iterator for MemorySession {
    type Item = Result<Feature, MemorySourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.fail_after == Some(self.yielded) {
            self.failed = true;
            return Some(Err(MemorySourceError::Interrupted(self.yielded)));
        }
        let feature = self.features.next()?;
        self.yielded = self.yielded.saturating_add(1);
        Some(Ok(feature))
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.live.set(self.live.get().saturating_sub(1));
    }
}

/// Build a tag map from string pairs.
#[must_use]
pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

/// An untagged node at `(lon, lat)`.
#[must_use]
pub fn node(id: i64, lon: f64, lat: f64) -> Feature {
    Feature::from(Node::new(id, Coord { x: lon, y: lat }))
}

/// An untagged, unresolved way.
#[must_use]
pub fn way<I>(id: i64, refs: I) -> Feature
where
    I: IntoIterator<Item = i64>,
{
    Feature::from(Way::new(id, refs))
}

/// An empty changeset.
#[must_use]
pub fn changeset(id: i64) -> Feature {
    Feature::from(Changeset {
        id,
        ..Changeset::default()
    })
}

/// A `type=multipolygon` relation over `(way id, role)` members.
#[must_use]
pub fn multipolygon(id: i64, members: &[(i64, &str)]) -> Feature {
    let members = members
        .iter()
        .map(|(way_id, role)| Member::way(*way_id, *role))
        .collect();
    Feature::from(Relation::new(id, members).with_tags(tags(&[("type", "multipolygon")])))
}

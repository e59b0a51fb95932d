//! Location resolution stage.
//!
//! Nodes are recorded in a [`LocationIndex`] as they pass; ways have each
//! node reference looked up. A reference that cannot be found stays
//! unresolved and the way is forwarded anyway. Resolution is a single
//! forward pass, so a node must precede the ways that reference it.

use geo::Coord;
use log::debug;

use super::Dispatch;
use crate::{
    feature::{Feature, Node, Way},
    handler::CallbackFailure,
    index::LocationIndex,
};

/// Counters describing one location stage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationStats {
    /// Nodes stored in the index.
    pub indexed: u64,
    /// Nodes not stored: negative ids or invalid coordinates.
    pub skipped: u64,
    /// Way references resolved to a location.
    pub resolved: u64,
    /// Way references left unresolved.
    pub unresolved: u64,
}

/// Resolves way node references against a location index.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use osmflow_core::{Feature, LocationStage, Node, SparseIndex, Way};
///
/// let mut stage = LocationStage::new(SparseIndex::default());
/// let mut node = Feature::from(Node::new(1, Coord { x: 1.0, y: 2.0 }));
/// let mut way = Feature::from(Way::new(10, [1, 2]));
/// stage.resolve(&mut node);
/// stage.resolve(&mut way);
/// let Feature::Way(way) = way else { unreachable!() };
/// assert_eq!(way.nodes[0].location, Some(Coord { x: 1.0, y: 2.0 }));
/// assert_eq!(way.nodes[1].location, None);
/// assert_eq!(stage.stats().unresolved, 1);
/// ```
#[derive(Debug)]
pub struct LocationStage<I> {
    index: I,
    stats: LocationStats,
}

impl<I> LocationStage<I>
where
    I: LocationIndex,
{
    /// Wrap an (usually empty) index.
    pub const fn new(index: I) -> Self {
        Self {
            index,
            stats: LocationStats {
                indexed: 0,
                skipped: 0,
                resolved: 0,
                unresolved: 0,
            },
        }
    }

    /// Record nodes and resolve ways in place; other kinds are untouched.
    pub fn resolve(&mut self, feature: &mut Feature) {
        match feature {
            Feature::Node(node) => self.record_node(node),
            Feature::Way(way) => self.locate_way(way),
            Feature::Relation(_) | Feature::Changeset(_) | Feature::Area(_) => {}
        }
    }

    /// Resolve `feature` and hand it downstream.
    ///
    /// # Errors
    /// Propagates the downstream callback failure.
    pub fn process<D>(&mut self, mut feature: Feature, downstream: &mut D) -> Result<(), CallbackFailure>
    where
        D: Dispatch + ?Sized,
    {
        self.resolve(&mut feature);
        downstream.dispatch(&feature)
    }

    /// Store the node location, replacing any earlier one for the same id.
    pub fn record_node(&mut self, node: &Node) {
        let (Some(key), Some(location)) = (index_key(node.id), validated_coord(node.location))
        else {
            debug!(
                "Not indexing node {} at ({}, {})",
                node.id, node.location.x, node.location.y
            );
            self.stats.skipped += 1;
            return;
        };
        self.index.insert(key, location);
        self.stats.indexed += 1;
    }

    /// Fill in every reference of `way` that the index knows about.
    ///
    /// The number and order of references never change. A miss keeps any
    /// location the reference already carries.
    pub fn locate_way(&mut self, way: &mut Way) {
        for node in &mut way.nodes {
            if let Some(location) = index_key(node.id).and_then(|key| self.index.get(key)) {
                node.location = Some(location);
            }
            if node.location.is_some() {
                self.stats.resolved += 1;
            } else {
                self.stats.unresolved += 1;
            }
        }
    }

    /// Counters accumulated so far.
    pub const fn stats(&self) -> LocationStats {
        self.stats
    }

    /// The index being populated.
    pub const fn index(&self) -> &I {
        &self.index
    }

    /// Consume the stage, returning its index and counters.
    pub fn into_parts(self) -> (I, LocationStats) {
        (self.index, self.stats)
    }
}

/// Negative ids (editor placeholders) are never indexed, so they always miss.
fn index_key(id: i64) -> Option<u64> {
    u64::try_from(id).ok()
}

fn validated_coord(location: Coord<f64>) -> Option<Coord<f64>> {
    let Coord { x: lon, y: lat } = location;
    (lon.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat))
    .then_some(location)
}

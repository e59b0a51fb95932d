//! Node location indices.
//!
//! A [`LocationIndex`] maps node identifiers to coordinates for the
//! duration of one run. Entries are upserted as nodes stream past and read
//! back when way references are resolved. There is no removal: an index is
//! write-once-per-id, read-many.

use std::{collections::HashMap, fmt, hash::BuildHasher, str::FromStr};

use geo::Coord;
use thiserror::Error;

mod sparse;

pub use sparse::SparseIndex;

/// Mapping from node identifier to location.
///
/// Inserting an id that is already present overwrites the stored location.
/// Looking up an absent id returns `None`; misses are not errors.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use osmflow_core::{LocationIndex, SparseIndex};
///
/// let mut index = SparseIndex::default();
/// index.insert(42, Coord { x: 1.0, y: 2.0 });
/// assert_eq!(index.get(42), Some(Coord { x: 1.0, y: 2.0 }));
/// assert_eq!(index.get(43), None);
/// ```
pub trait LocationIndex {
    /// Store `location` for `id`, replacing any previous value.
    fn insert(&mut self, id: u64, location: Coord<f64>);

    /// Location stored for `id`, if any.
    fn get(&self, id: u64) -> Option<Coord<f64>>;

    /// Number of distinct ids stored.
    fn len(&self) -> usize;

    /// Whether no ids are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> LocationIndex for HashMap<u64, Coord<f64>, S>
where
    S: BuildHasher,
{
    fn insert(&mut self, id: u64, location: Coord<f64>) {
        HashMap::insert(self, id, location);
    }

    fn get(&self, id: u64) -> Option<Coord<f64>> {
        HashMap::get(self, &id).copied()
    }

    fn len(&self) -> usize {
        HashMap::len(self)
    }
}

/// Index implementations selectable for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
#[non_exhaustive]
pub enum IndexVariant {
    /// [`SparseIndex`], suited to large, sparse, monotonically assigned ids.
    #[default]
    Sparse,
}

impl IndexVariant {
    /// Canonical configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sparse => "sparse",
        }
    }
}

impl fmt::Display for IndexVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown [`IndexVariant`] name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown location index {0:?}; expected \"sparse\"")]
pub struct UnknownIndexVariant(pub String);

impl FromStr for IndexVariant {
    type Err = UnknownIndexVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sparse" | "sparse_index" => Ok(Self::Sparse),
            _ => Err(UnknownIndexVariant(value.to_owned())),
        }
    }
}

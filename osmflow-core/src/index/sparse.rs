//! Page-table location index for sparse identifier ranges.
//!
//! Identifiers are split into a page number and an eight-bit slot. Pages
//! live in a hash map so untouched id ranges cost nothing; each page keeps a
//! 256-bit occupancy bitmap and a dense vector holding only the occupied
//! slots, ordered by slot.

use std::collections::HashMap;

use geo::Coord;

use super::LocationIndex;

const SLOT_BITS: u32 = 8;
const SLOT_MASK: u64 = (1 << SLOT_BITS) - 1;
const WORD_SHIFT: u8 = 6;
const WORD_MASK: u8 = (1 << WORD_SHIFT) - 1;

/// Space-efficient [`LocationIndex`] for large, sparse node ids.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use osmflow_core::{LocationIndex, SparseIndex};
///
/// let mut index = SparseIndex::default();
/// index.insert(9_000_000_000, Coord { x: 13.4, y: 52.5 });
/// index.insert(9_000_000_000, Coord { x: 13.5, y: 52.6 });
/// assert_eq!(index.len(), 1);
/// assert_eq!(index.get(9_000_000_000), Some(Coord { x: 13.5, y: 52.6 }));
/// ```
#[derive(Debug, Default, Clone)]
pub struct SparseIndex {
    pages: HashMap<u64, SparseGroup>,
    len: usize,
}

impl SparseIndex {
    /// Number of pages currently allocated.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "the slot is masked to eight bits before narrowing"
    )]
    const fn split(id: u64) -> (u64, u8) {
        (id >> SLOT_BITS, (id & SLOT_MASK) as u8)
    }
}

impl LocationIndex for SparseIndex {
    fn insert(&mut self, id: u64, location: Coord<f64>) {
        let (page, slot) = Self::split(id);
        if self.pages.entry(page).or_default().upsert(slot, location) {
            self.len += 1;
        }
    }

    fn get(&self, id: u64) -> Option<Coord<f64>> {
        let (page, slot) = Self::split(id);
        self.pages.get(&page).and_then(|group| group.get(slot))
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[derive(Debug, Default, Clone)]
struct SparseGroup {
    occupied: [u64; 4],
    locations: Vec<Coord<f64>>,
}

impl SparseGroup {
    const fn position(slot: u8) -> (usize, u64) {
        ((slot >> WORD_SHIFT) as usize, 1 << (slot & WORD_MASK))
    }

    fn is_occupied(&self, slot: u8) -> bool {
        let (word, bit) = Self::position(slot);
        self.occupied
            .get(word)
            .is_some_and(|bits| bits & bit != 0)
    }

    /// Number of occupied slots strictly below `slot`.
    fn rank(&self, slot: u8) -> usize {
        let (word, bit) = Self::position(slot);
        let below: u32 = self
            .occupied
            .iter()
            .take(word)
            .map(|bits| bits.count_ones())
            .sum();
        let within = self
            .occupied
            .get(word)
            .map_or(0, |bits| (bits & (bit - 1)).count_ones());
        (below + within) as usize
    }

    /// Returns `true` when the slot was previously empty.
    fn upsert(&mut self, slot: u8, location: Coord<f64>) -> bool {
        let rank = self.rank(slot);
        if self.is_occupied(slot) {
            if let Some(stored) = self.locations.get_mut(rank) {
                *stored = location;
            }
            return false;
        }
        let (word, bit) = Self::position(slot);
        if let Some(bits) = self.occupied.get_mut(word) {
            *bits |= bit;
        }
        self.locations.insert(rank, location);
        true
    }

    fn get(&self, slot: u8) -> Option<Coord<f64>> {
        if !self.is_occupied(slot) {
            return None;
        }
        self.locations.get(self.rank(slot)).copied()
    }
}

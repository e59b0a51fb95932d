//! Two-pass area assembly.
//!
//! Pass 1 feeds relations into an [`AreaCollector`], which remembers every
//! multipolygon or boundary relation and the way ids it still needs. Pass 2
//! runs an [`AreaStage`]: features are resolved, dispatched, and each way is
//! offered to the collector. A way that completes a relation (or a closed way
//! standing on its own) yields an [`Area`] that is dispatched before the
//! stage returns.

use std::collections::{HashMap, HashSet};

use geo::MultiPolygon;
use log::{debug, warn};

use super::{Dispatch, location::LocationStage, location::LocationStats};
use crate::{
    assemble::{AreaAssembler, MemberWay, RingRole},
    feature::{Area, AreaOrigin, Feature, MemberKind, Relation, Tags, Way},
    handler::CallbackFailure,
    index::LocationIndex,
};

/// Counters describing one area assembly run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AreaStats {
    /// Relations registered during pass 1.
    pub relations: u64,
    /// Areas emitted, from ways and relations.
    pub areas: u64,
    /// Relations whose members never all arrived.
    pub abandoned: u64,
    /// Complete candidates whose geometry could not be assembled.
    pub failed: u64,
}

#[derive(Debug)]
struct PendingArea {
    tags: Tags,
    members: Vec<(i64, RingRole)>,
    missing: HashSet<i64>,
    ways: HashMap<i64, Way>,
}

/// Table of relations waiting for their member ways.
///
/// # Examples
/// ```
/// use osmflow_core::{AreaCollector, Member, Relation, Tags};
///
/// let tags = Tags::from([("type".to_owned(), "multipolygon".to_owned())]);
/// let relation = Relation::new(1, vec![Member::way(10, "outer")]).with_tags(tags);
/// let mut collector = AreaCollector::default();
/// assert!(collector.register(&relation));
/// assert!(collector.is_member(10));
/// assert_eq!(collector.finish().abandoned, 1);
/// ```
#[derive(Debug, Default)]
pub struct AreaCollector {
    pending: HashMap<i64, PendingArea>,
    awaiting: HashMap<i64, Vec<i64>>,
    member_ways: HashSet<i64>,
    stats: AreaStats,
}

impl AreaCollector {
    /// Pass 1: register every qualifying relation of `session`.
    ///
    /// The session is consumed and dropped before this returns.
    ///
    /// # Errors
    /// Returns the first error yielded by the session.
    pub fn collect_relations<S, E>(&mut self, session: S) -> Result<(), E>
    where
        S: IntoIterator<Item = Result<Feature, E>>,
    {
        for feature in session {
            if let Feature::Relation(relation) = feature? {
                self.register(&relation);
            }
        }
        debug!(
            "Collected {} area relations awaiting {} member ways",
            self.pending.len(),
            self.awaiting.len()
        );
        Ok(())
    }

    /// Register one relation; returns whether it is now pending.
    ///
    /// Only relations tagged `type=multipolygon` or `type=boundary` with at
    /// least one way member qualify. Repeated member ids are kept once.
    pub fn register(&mut self, relation: &Relation) -> bool {
        if !is_area_relation(relation) {
            return false;
        }
        if self.pending.contains_key(&relation.id) {
            debug!("Ignoring repeated relation {}", relation.id);
            return false;
        }
        let mut members = Vec::new();
        let mut missing = HashSet::new();
        for member in relation
            .members
            .iter()
            .filter(|member| member.kind == MemberKind::Way)
        {
            if missing.insert(member.id) {
                members.push((member.id, RingRole::from_member_role(&member.role)));
            }
        }
        if members.is_empty() {
            return false;
        }
        for way_id in &missing {
            self.awaiting.entry(*way_id).or_default().push(relation.id);
            self.member_ways.insert(*way_id);
        }
        self.pending.insert(
            relation.id,
            PendingArea {
                tags: relation.tags.clone(),
                members,
                missing,
                ways: HashMap::new(),
            },
        );
        self.stats.relations += 1;
        true
    }

    /// Whether `way_id` is a member of any registered relation.
    #[must_use]
    pub fn is_member(&self, way_id: i64) -> bool {
        self.member_ways.contains(&way_id)
    }

    /// Number of relations still waiting for members.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pass 2: offer a resolved way and collect the areas it completes.
    ///
    /// A closed way that belongs to no registered relation and is not tagged
    /// `area=no` becomes an area of its own. Each relation whose last missing
    /// member is `way` is removed from the table and assembled.
    pub fn feed_way<A>(&mut self, way: &Way, assembler: &A) -> Vec<Area>
    where
        A: AreaAssembler + ?Sized,
    {
        let mut areas = Vec::new();
        if way.is_closed() && !self.is_member(way.id) && !tagged_area_no(&way.tags) {
            let members = [MemberWay {
                way,
                role: RingRole::Outer,
            }];
            let geometry = assembler.assemble(&members);
            self.record(AreaOrigin::Way(way.id), way.tags.clone(), geometry, &mut areas);
        }

        let Some(relation_ids) = self.awaiting.remove(&way.id) else {
            return areas;
        };
        for relation_id in relation_ids {
            let complete = self.pending.get_mut(&relation_id).is_some_and(|entry| {
                entry.missing.remove(&way.id);
                entry.ways.insert(way.id, way.clone());
                entry.missing.is_empty()
            });
            if !complete {
                continue;
            }
            if let Some(entry) = self.pending.remove(&relation_id) {
                let (tags, geometry) = assemble_relation(entry, assembler);
                self.record(AreaOrigin::Relation(relation_id), tags, geometry, &mut areas);
            }
        }
        areas
    }

    fn record(
        &mut self,
        origin: AreaOrigin,
        tags: Tags,
        geometry: Option<MultiPolygon<f64>>,
        areas: &mut Vec<Area>,
    ) {
        let Some(geometry) = geometry else {
            debug!("Could not assemble area from {origin:?}");
            self.stats.failed += 1;
            return;
        };
        if let Some(area) = Area::new(origin, tags, geometry) {
            self.stats.areas += 1;
            areas.push(area);
        } else {
            warn!(
                "Skipped area from {origin:?}: id {} cannot be doubled without overflow",
                origin.original_id()
            );
            self.stats.failed += 1;
        }
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> AreaStats {
        self.stats
    }

    /// End of stream: drop incomplete relations and return the counters.
    ///
    /// Abandoned relations are logged at debug level, never reported as
    /// errors.
    #[must_use]
    pub fn finish(mut self) -> AreaStats {
        for (relation_id, entry) in &self.pending {
            debug!(
                "Abandoned relation {relation_id}: {} of {} member ways never arrived",
                entry.missing.len(),
                entry.members.len()
            );
        }
        self.stats.abandoned += u64::try_from(self.pending.len()).unwrap_or(u64::MAX);
        self.stats
    }
}

fn is_area_relation(relation: &Relation) -> bool {
    matches!(
        relation.tags.get("type").map(String::as_str),
        Some("multipolygon" | "boundary")
    )
}

fn tagged_area_no(tags: &Tags) -> bool {
    tags.get("area").is_some_and(|value| value == "no")
}

/// Relation tags without `type`, and the assembled geometry if any.
fn assemble_relation<A>(entry: PendingArea, assembler: &A) -> (Tags, Option<MultiPolygon<f64>>)
where
    A: AreaAssembler + ?Sized,
{
    let PendingArea {
        mut tags,
        members,
        ways,
        ..
    } = entry;
    let member_ways: Vec<MemberWay<'_>> = members
        .iter()
        .filter_map(|(way_id, role)| ways.get(way_id).map(|way| MemberWay { way, role: *role }))
        .collect();
    let geometry = assembler.assemble(&member_ways);
    tags.remove("type");
    (tags, geometry)
}

/// Pass 2 pipeline: location resolution, dispatch, then area assembly.
#[derive(Debug)]
pub struct AreaStage<I, A> {
    locations: LocationStage<I>,
    collector: AreaCollector,
    assembler: A,
}

impl<I, A> AreaStage<I, A>
where
    I: LocationIndex,
    A: AreaAssembler,
{
    /// Combine a fresh location stage with a collector filled by pass 1.
    pub const fn new(locations: LocationStage<I>, collector: AreaCollector, assembler: A) -> Self {
        Self {
            locations,
            collector,
            assembler,
        }
    }

    /// Resolve and dispatch `feature`; for ways, dispatch every area they
    /// complete before returning.
    ///
    /// # Errors
    /// Propagates the first downstream callback failure.
    pub fn process<D>(&mut self, mut feature: Feature, downstream: &mut D) -> Result<(), CallbackFailure>
    where
        D: Dispatch + ?Sized,
    {
        self.locations.resolve(&mut feature);
        downstream.dispatch(&feature)?;
        if let Feature::Way(way) = &feature {
            for area in self.collector.feed_way(way, &self.assembler) {
                downstream.dispatch(&Feature::Area(area))?;
            }
        }
        Ok(())
    }

    /// End of stream: abandon incomplete relations and return both stages'
    /// counters.
    #[must_use]
    pub fn finish(self) -> (LocationStats, AreaStats) {
        let (_, location_stats) = self.locations.into_parts();
        (location_stats, self.collector.finish())
    }
}

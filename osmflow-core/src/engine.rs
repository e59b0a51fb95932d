//! Dispatch engine.
//!
//! The engine opens sessions on a [`FeatureSource`] as an [`ExecutionPlan`]
//! dictates, pushes features through the selected stage and hands each one
//! to the matching consumer callback. Sessions are consumed by value, so
//! they are released on every return path, including callback failures.

use log::{debug, warn};
use thiserror::Error;

use crate::{
    assemble::{AreaAssembler, RingAssembler},
    feature::{Feature, FeatureKind, FeatureKinds},
    handler::{CallbackFailure, Callbacks},
    index::{IndexVariant, SparseIndex},
    plan::{ApplyOptions, AuxiliaryStage, ExecutionPlan},
    source::FeatureSource,
    stage::{AreaCollector, AreaStage, AreaStats, Dispatch, LocationStage, LocationStats},
};

/// Number of callback invocations per feature kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DispatchCounts {
    /// Node callbacks invoked.
    pub nodes: u64,
    /// Way callbacks invoked.
    pub ways: u64,
    /// Relation callbacks invoked.
    pub relations: u64,
    /// Changeset callbacks invoked.
    pub changesets: u64,
    /// Area callbacks invoked.
    pub areas: u64,
}

impl DispatchCounts {
    const fn record(&mut self, kind: FeatureKind) {
        let counter = match kind {
            FeatureKind::Node => &mut self.nodes,
            FeatureKind::Way => &mut self.ways,
            FeatureKind::Relation => &mut self.relations,
            FeatureKind::Changeset => &mut self.changesets,
            FeatureKind::Area => &mut self.areas,
        };
        *counter = counter.saturating_add(1);
    }

    /// Total callbacks invoked.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.nodes
            .saturating_add(self.ways)
            .saturating_add(self.relations)
            .saturating_add(self.changesets)
            .saturating_add(self.areas)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Plan the run followed.
    pub plan: ExecutionPlan,
    /// Sessions opened on the source.
    pub sessions: u32,
    /// Callback invocations per kind.
    pub dispatched: DispatchCounts,
    /// Location stage counters; `None` when no index was built.
    pub locations: Option<LocationStats>,
    /// Area stage counters; `None` outside area mode.
    pub areas: Option<AreaStats>,
}

impl ApplyReport {
    const fn new(plan: ExecutionPlan) -> Self {
        Self {
            plan,
            sessions: 0,
            dispatched: DispatchCounts {
                nodes: 0,
                ways: 0,
                relations: 0,
                changesets: 0,
                areas: 0,
            },
            locations: None,
            areas: None,
        }
    }
}

/// Fatal conditions that end a run.
#[derive(Debug, Error)]
pub enum ApplyError<E> {
    /// The source could not be opened or read.
    #[error("feature stream failed: {0}")]
    Source(#[source] E),
    /// A consumer callback returned an error.
    #[error(transparent)]
    Callback(#[from] CallbackFailure),
}

struct Dispatcher<'c, 'a> {
    callbacks: &'c mut Callbacks<'a>,
    counts: DispatchCounts,
}

impl Dispatch for Dispatcher<'_, '_> {
    fn dispatch(&mut self, feature: &Feature) -> Result<(), CallbackFailure> {
        if self.callbacks.invoke(feature)? {
            self.counts.record(feature.kind());
        }
        Ok(())
    }
}

/// Run `plan` against `source`, assembling areas with [`RingAssembler`].
///
/// # Errors
/// Returns [`ApplyError::Source`] when a session cannot be opened or read
/// and [`ApplyError::Callback`] when a callback fails. Unresolved locations
/// and incomplete relations are never errors.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use osmflow_core::{
///     Callbacks, ExecutionPlan, IndexVariant, apply,
///     test_support::{MemorySource, node, way},
/// };
///
/// let source = MemorySource::new([node(1, 0.0, 0.0), node(2, 1.0, 0.0), way(10, [1, 2])]);
/// let mut lengths = Vec::new();
/// let mut callbacks = Callbacks::new().on_way(|way| {
///     lengths.push(way.nodes.len());
///     Ok(())
/// });
/// let plan = ExecutionPlan::new(callbacks.capabilities(), false, IndexVariant::Sparse);
/// let report = apply(&source, &plan, &mut callbacks).expect("run succeeds");
/// drop(callbacks);
/// assert_eq!(lengths, vec![2]);
/// assert_eq!(report.locations, None);
/// ```
pub fn apply<S>(
    source: &S,
    plan: &ExecutionPlan,
    callbacks: &mut Callbacks<'_>,
) -> Result<ApplyReport, ApplyError<S::Error>>
where
    S: FeatureSource + ?Sized,
{
    apply_with_assembler(source, plan, callbacks, &RingAssembler)
}

/// Derive a plan from the filled callback slots and run it.
///
/// # Errors
/// See [`apply`].
pub fn apply_source<S>(
    source: &S,
    options: ApplyOptions,
    mut callbacks: Callbacks<'_>,
) -> Result<ApplyReport, ApplyError<S::Error>>
where
    S: FeatureSource + ?Sized,
{
    let capabilities = callbacks.capabilities();
    if capabilities.is_empty() {
        debug!("No callbacks registered; the run dispatches nothing");
    }
    let plan = ExecutionPlan::from_options(capabilities, options);
    apply(source, &plan, &mut callbacks)
}

/// Run `plan` with a custom area assembler.
///
/// # Errors
/// See [`apply`].
pub fn apply_with_assembler<S, A>(
    source: &S,
    plan: &ExecutionPlan,
    callbacks: &mut Callbacks<'_>,
    assembler: &A,
) -> Result<ApplyReport, ApplyError<S::Error>>
where
    S: FeatureSource + ?Sized,
    A: AreaAssembler + ?Sized,
{
    let mut report = ApplyReport::new(*plan);
    let mut dispatcher = Dispatcher {
        callbacks,
        counts: DispatchCounts::default(),
    };

    match plan.stage() {
        AuxiliaryStage::None => {
            let session = open(source, plan.kinds(), &mut report)?;
            for feature in session {
                dispatcher.dispatch(&feature.map_err(ApplyError::Source)?)?;
            }
        }
        AuxiliaryStage::Locations => {
            let mut stage = LocationStage::new(build_index(plan.index()));
            let session = open(source, plan.kinds(), &mut report)?;
            for feature in session {
                stage.process(feature.map_err(ApplyError::Source)?, &mut dispatcher)?;
            }
            report.locations = Some(stage.stats());
        }
        AuxiliaryStage::Areas => {
            let mut collector = AreaCollector::default();
            let relations = open(source, FeatureKind::Relation.into(), &mut report)?;
            collector
                .collect_relations(relations)
                .map_err(ApplyError::Source)?;

            let mut stage = AreaStage::new(
                LocationStage::new(build_index(plan.index())),
                collector,
                assembler,
            );
            let session = open(source, plan.kinds(), &mut report)?;
            for feature in session {
                stage.process(feature.map_err(ApplyError::Source)?, &mut dispatcher)?;
            }
            let (locations, areas) = stage.finish();
            report.locations = Some(locations);
            report.areas = Some(areas);
        }
    }

    if let Some(unresolved) = report.locations.map(|stats| stats.unresolved)
        && unresolved > 0
    {
        warn!("Skipped {unresolved} way node references without coordinates");
    }
    report.dispatched = dispatcher.counts;
    debug!(
        "Run finished after {} sessions with {} callbacks",
        report.sessions,
        report.dispatched.total()
    );
    Ok(report)
}

fn open<S>(
    source: &S,
    kinds: FeatureKinds,
    report: &mut ApplyReport,
) -> Result<S::Session, ApplyError<S::Error>>
where
    S: FeatureSource + ?Sized,
{
    let session = source.open(kinds).map_err(ApplyError::Source)?;
    report.sessions = report.sessions.saturating_add(1);
    debug!("Opened session {} for kinds {kinds:?}", report.sessions);
    Ok(session)
}

fn build_index(variant: IndexVariant) -> SparseIndex {
    match variant {
        IndexVariant::Sparse => SparseIndex::default(),
    }
}

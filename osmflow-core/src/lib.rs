//! Handler dispatch over OpenStreetMap feature streams.
//!
//! A consumer fills some of five callback slots ([`Callbacks`]). The planner
//! turns the filled slots into an [`ExecutionPlan`]: which feature kinds to
//! read and whether to interpose location resolution or two-pass area
//! assembly. The engine then streams a [`FeatureSource`] through the chosen
//! stage and invokes the callbacks in storage order.
//!
//! ```
//! use osmflow_core::{
//!     ApplyOptions, Callbacks, apply_source,
//!     test_support::{MemorySource, multipolygon, node, way},
//! };
//!
//! let source = MemorySource::new([
//!     node(1, 0.0, 0.0),
//!     node(2, 1.0, 0.0),
//!     node(3, 1.0, 1.0),
//!     way(10, [1, 2, 3, 1]),
//!     multipolygon(4, &[(10, "outer")]),
//! ]);
//! let mut areas = Vec::new();
//! let callbacks = Callbacks::new().on_area(|area| {
//!     areas.push(area.id);
//!     Ok(())
//! });
//! apply_source(&source, ApplyOptions::default(), callbacks).expect("run succeeds");
//! assert_eq!(areas, vec![9]);
//! ```

pub mod assemble;
pub mod engine;
pub mod feature;
pub mod handler;
pub mod index;
pub mod plan;
pub mod source;
pub mod stage;
pub mod test_support;

pub use assemble::{AreaAssembler, MemberWay, RingAssembler, RingRole};
pub use engine::{
    ApplyError, ApplyReport, DispatchCounts, apply, apply_source, apply_with_assembler,
};
pub use feature::{
    Area, AreaOrigin, Changeset, Feature, FeatureKind, FeatureKinds, Member, MemberKind, Node,
    NodeRef, Relation, Tags, Way,
};
pub use handler::{CallbackError, CallbackFailure, Callbacks};
pub use index::{IndexVariant, LocationIndex, SparseIndex, UnknownIndexVariant};
pub use plan::{ApplyOptions, AuxiliaryStage, Capabilities, ExecutionPlan};
pub use source::FeatureSource;
pub use stage::{
    AreaCollector, AreaStage, AreaStats, Dispatch, LocationStage, LocationStats,
};

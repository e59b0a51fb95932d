//! Facade crate for osmflow.
//!
//! This crate re-exports the handler-dispatch core and, behind the `pbf`
//! feature, the PBF file reader.

#![forbid(unsafe_code)]

pub use osmflow_core::{
    ApplyError, ApplyOptions, ApplyReport, Area, AreaAssembler, AreaOrigin, AuxiliaryStage,
    CallbackError, CallbackFailure, Callbacks, Capabilities, Changeset, DispatchCounts,
    ExecutionPlan, Feature, FeatureKind, FeatureKinds, FeatureSource, IndexVariant,
    LocationIndex, Member, MemberKind, Node, NodeRef, Relation, RingAssembler, SparseIndex,
    Tags, UnknownIndexVariant, Way, apply, apply_source, apply_with_assembler,
};

#[cfg(feature = "pbf")]
pub use osmflow_data::{PbfError, PbfSession, PbfSource, apply_file};

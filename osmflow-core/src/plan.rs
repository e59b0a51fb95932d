//! Capability-driven run planning.
//!
//! The planner turns "which callbacks exist" plus the `locations` flag into
//! the minimal set of kinds to read and the auxiliary stage to interpose, so
//! a run never pays for work the consumer cannot observe.

use crate::{
    feature::{FeatureKind, FeatureKinds},
    index::IndexVariant,
};

/// Which callback slots a consumer fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capabilities {
    /// The consumer handles nodes.
    pub node: bool,
    /// The consumer handles ways.
    pub way: bool,
    /// The consumer handles relations.
    pub relation: bool,
    /// The consumer handles changesets.
    pub changeset: bool,
    /// The consumer handles assembled areas.
    pub area: bool,
}

impl Capabilities {
    /// Whether no slot is filled.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.node || self.way || self.relation || self.changeset || self.area)
    }
}

/// The stage placed between the reader and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuxiliaryStage {
    /// Features go straight to dispatch.
    #[default]
    None,
    /// Way node references are resolved against a location index.
    Locations,
    /// Relations are collected first, then areas are assembled on a second
    /// pass that also resolves locations.
    Areas,
}

impl AuxiliaryStage {
    /// Lowercase name used in logs and summaries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Locations => "locations",
            Self::Areas => "areas",
        }
    }
}

/// Run-time flags of the run entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyOptions {
    /// Resolve way node locations even without an area callback.
    pub locations: bool,
    /// Location index to build when locations are needed.
    pub index: IndexVariant,
}

impl ApplyOptions {
    /// Options with location resolution enabled.
    #[must_use]
    pub const fn with_locations(mut self, locations: bool) -> Self {
        self.locations = locations;
        self
    }

    /// Options selecting a location index implementation.
    #[must_use]
    pub const fn with_index(mut self, index: IndexVariant) -> Self {
        self.index = index;
        self
    }
}

/// What one run reads and which stage it interposes.
///
/// # Examples
/// ```
/// use osmflow_core::{AuxiliaryStage, Capabilities, ExecutionPlan, FeatureKind, IndexVariant};
///
/// let capabilities = Capabilities { way: true, ..Capabilities::default() };
/// let plan = ExecutionPlan::new(capabilities, true, IndexVariant::Sparse);
/// assert_eq!(plan.kinds(), FeatureKind::Node | FeatureKind::Way);
/// assert_eq!(plan.stage(), AuxiliaryStage::Locations);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionPlan {
    kinds: FeatureKinds,
    stage: AuxiliaryStage,
    index: IndexVariant,
}

impl ExecutionPlan {
    /// Derive a plan. The result depends only on the arguments.
    #[must_use]
    pub fn new(capabilities: Capabilities, locations: bool, index: IndexVariant) -> Self {
        let mut kinds = FeatureKinds::empty();
        let stage = if capabilities.area {
            kinds |= FeatureKind::Node | FeatureKind::Way | FeatureKind::Relation;
            AuxiliaryStage::Areas
        } else {
            kinds.set(FeatureKind::Node, locations || capabilities.node);
            kinds.set(FeatureKind::Way, capabilities.way);
            kinds.set(FeatureKind::Relation, capabilities.relation);
            if locations {
                AuxiliaryStage::Locations
            } else {
                AuxiliaryStage::None
            }
        };
        kinds.set(FeatureKind::Changeset, capabilities.changeset);
        Self {
            kinds,
            stage,
            index,
        }
    }

    /// Derive a plan from run options.
    #[must_use]
    pub fn from_options(capabilities: Capabilities, options: ApplyOptions) -> Self {
        Self::new(capabilities, options.locations, options.index)
    }

    /// Kinds requested from the reader. Never contains [`FeatureKind::Area`].
    #[must_use]
    pub const fn kinds(&self) -> FeatureKinds {
        self.kinds
    }

    /// Stage interposed before dispatch.
    #[must_use]
    pub const fn stage(&self) -> AuxiliaryStage {
        self.stage
    }

    /// Location index used by the stage, if one is needed.
    #[must_use]
    pub const fn index(&self) -> IndexVariant {
        self.index
    }

    /// Whether the plan reads nothing at all.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.kinds.is_empty()
    }
}

//! Consumer callback slots.
//!
//! A consumer registers one optional callback per feature kind. Which slots
//! are filled is what the planner inspects, so registering a callback is
//! the same thing as asking for that kind of feature.

use std::{error::Error, fmt};

use thiserror::Error;

use crate::{
    feature::{Area, Changeset, Feature, FeatureKind, Node, Relation, Way},
    plan::Capabilities,
};

/// Error returned by a consumer callback.
pub type CallbackError = Box<dyn Error + Send + Sync>;

type Slot<'a, T> = Option<Box<dyn FnMut(&T) -> Result<(), CallbackError> + 'a>>;

/// A consumer callback failed; the run stops with this error.
#[derive(Debug, Error)]
#[error("{kind} callback failed for id {id}: {source}")]
pub struct CallbackFailure {
    /// Kind of the feature being delivered.
    pub kind: FeatureKind,
    /// Identifier of the feature being delivered.
    pub id: i64,
    /// Error returned by the callback.
    #[source]
    pub source: CallbackError,
}

/// The five callback slots a consumer may fill.
///
/// # Examples
/// ```
/// use osmflow_core::Callbacks;
///
/// let mut ways = 0_u32;
/// let callbacks = Callbacks::new().on_way(|_| {
///     ways += 1;
///     Ok(())
/// });
/// let capabilities = callbacks.capabilities();
/// assert!(capabilities.way);
/// assert!(!capabilities.node);
/// ```
#[derive(Default)]
pub struct Callbacks<'a> {
    node: Slot<'a, Node>,
    way: Slot<'a, Way>,
    relation: Slot<'a, Relation>,
    changeset: Slot<'a, Changeset>,
    area: Slot<'a, Area>,
}

impl<'a> Callbacks<'a> {
    /// An empty callback set; running it is a legal no-op.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the node callback.
    #[must_use]
    pub fn on_node<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Node) -> Result<(), CallbackError> + 'a,
    {
        self.node = Some(Box::new(callback));
        self
    }

    /// Register the way callback. Ways arrive resolved when locations are
    /// enabled.
    #[must_use]
    pub fn on_way<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Way) -> Result<(), CallbackError> + 'a,
    {
        self.way = Some(Box::new(callback));
        self
    }

    /// Register the relation callback.
    #[must_use]
    pub fn on_relation<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Relation) -> Result<(), CallbackError> + 'a,
    {
        self.relation = Some(Box::new(callback));
        self
    }

    /// Register the changeset callback.
    #[must_use]
    pub fn on_changeset<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Changeset) -> Result<(), CallbackError> + 'a,
    {
        self.changeset = Some(Box::new(callback));
        self
    }

    /// Register the area callback. Doing so switches the run to two-pass
    /// area assembly.
    #[must_use]
    pub fn on_area<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Area) -> Result<(), CallbackError> + 'a,
    {
        self.area = Some(Box::new(callback));
        self
    }

    /// Which slots are filled.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        Capabilities {
            node: self.node.is_some(),
            way: self.way.is_some(),
            relation: self.relation.is_some(),
            changeset: self.changeset.is_some(),
            area: self.area.is_some(),
        }
    }

    /// Deliver `feature` to its slot.
    ///
    /// Returns `Ok(false)` when the slot is empty and nothing was invoked.
    ///
    /// # Errors
    /// Returns [`CallbackFailure`] when the callback itself fails.
    pub fn invoke(&mut self, feature: &Feature) -> Result<bool, CallbackFailure> {
        let outcome = match feature {
            Feature::Node(node) => self.node.as_mut().map(|callback| callback(node)),
            Feature::Way(way) => self.way.as_mut().map(|callback| callback(way)),
            Feature::Relation(relation) => {
                self.relation.as_mut().map(|callback| callback(relation))
            }
            Feature::Changeset(changeset) => {
                self.changeset.as_mut().map(|callback| callback(changeset))
            }
            Feature::Area(area) => self.area.as_mut().map(|callback| callback(area)),
        };
        match outcome {
            None => Ok(false),
            Some(Ok(())) => Ok(true),
            Some(Err(source)) => Err(CallbackFailure {
                kind: feature.kind(),
                id: feature.id(),
                source,
            }),
        }
    }
}

impl fmt::Debug for Callbacks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

//! Auxiliary stages placed between a feature stream and dispatch.

use crate::{feature::Feature, handler::CallbackFailure};

mod area;
mod location;

pub use area::{AreaCollector, AreaStage, AreaStats};
pub use location::{LocationStage, LocationStats};

/// Receives features leaving a stage.
///
/// The dispatch engine implements this by invoking consumer callbacks;
/// tests implement it to record delivery order. Closures with the right
/// signature implement it too.
pub trait Dispatch {
    /// Deliver one feature downstream.
    ///
    /// # Errors
    /// Returns the failure of the callback that handled the feature.
    fn dispatch(&mut self, feature: &Feature) -> Result<(), CallbackFailure>;
}

impl<F> Dispatch for F
where
    F: FnMut(&Feature) -> Result<(), CallbackFailure>,
{
    fn dispatch(&mut self, feature: &Feature) -> Result<(), CallbackFailure> {
        self(feature)
    }
}

//! Synchronization pipeline.
//!
//! - `detect`: change events since the checkpoint, resolved to entities
//! - `geofence`: community boundary containment
//! - `compose`: announcement text
//! - `deliver`: publishing with bounded retry
//! - `run`: the coordinator tying the steps to the checkpoint

pub mod compose;
pub mod deliver;
pub mod detect;
pub mod geofence;
pub mod run;

#[cfg(test)]
pub(crate) mod testing;

pub use compose::MessageComposer;
pub use deliver::DeliveryEngine;
pub use detect::{ChangeDetector, is_new_node};
pub use geofence::Geofence;
pub use run::{RunCoordinator, RunReport, RunState};

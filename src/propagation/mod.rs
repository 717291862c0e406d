//! Propagation toggle
//!
//! Forces an out-of-schedule push from a supplier to one consumer.

mod errors;
mod toggle;

pub use errors::{ToggleError, TogglePhase, ToggleResult};
pub use toggle::{force_update, REPLICA_ENABLED_ATTR};

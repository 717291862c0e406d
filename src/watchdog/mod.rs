//! Watchdog integration
//!
//! - `estimate`: upper bound of a full run, from the topology and timings
//! - `notify`: `sd_notify` messages to the service manager

mod estimate;
pub mod notify;

pub use estimate::{estimate, Timings};
pub use notify::Notifier;

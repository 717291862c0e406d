//! Verification engine
//!
//! Drives the write / wait / check / cleanup cycle over a topology and
//! collects a `ResultTree`. A run is aborted only by the garbage invariant.

mod errors;
mod orchestrator;
mod result;
mod state;

pub use errors::{VerifyError, VerifyResult};
pub use orchestrator::Orchestrator;
pub use result::{ResultTree, RunReport, SupplierOutcome};
pub use state::UnitState;

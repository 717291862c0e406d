//! Replication topology and canary entry
//!
//! The validated, immutable inputs of a verification run.

mod entry;
mod errors;
mod model;

pub use entry::{NamingAttribute, TestEntry};
pub use errors::{TopologyError, TopologyResult};
pub use model::{BaseDnSpec, ConsumerSpec, InstanceSpec, Protocol, SupplierSpec, Topology, Unit};

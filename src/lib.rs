//! ds-repltest - replication check for multi-supplier directory topologies
//!
//! Writes a canary entry on every supplier, waits for it to reach each
//! consumer, removes it again and reports a pass/fail tree per instance,
//! base DN, supplier and consumer.

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod directory;
pub mod notify;
pub mod observability;
pub mod propagation;
pub mod topology;
pub mod verify;
pub mod watchdog;

//! Watchdog timing estimator
//!
//! Upper bound of one full traversal, handed to the service manager before
//! the run starts so it does not kill a slow but healthy check.

use std::time::Duration;

use crate::topology::Topology;

/// Durations that drive a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Connect and operation timeout
    pub network_timeout: Duration,
    /// Wait after the write and after each supplier
    pub settle_wait: Duration,
    /// Wait after each forced update
    pub update_settle_wait: Duration,
}

impl Timings {
    pub fn new(network_timeout: Duration, settle_wait: Duration, update_settle_wait: Duration) -> Self {
        Self {
            network_timeout,
            settle_wait,
            update_settle_wait,
        }
    }

    /// No waits and a one second timeout
    pub fn immediate() -> Self {
        Self::new(Duration::from_secs(1), Duration::ZERO, Duration::ZERO)
    }
}

/// Upper bound for a full traversal of `topology`
///
/// Per supplier: `timeout + 2 * settle_wait`. Per consumer: `timeout`, plus
/// `2 * update_settle_wait` when it has a replication agreement.
pub fn estimate(topology: &Topology, timings: &Timings) -> Duration {
    let mut total = Duration::ZERO;
    for unit in topology.units() {
        total = total
            .saturating_add(timings.network_timeout)
            .saturating_add(timings.settle_wait.saturating_mul(2));
        for consumer in &unit.supplier.consumers {
            total = total.saturating_add(timings.network_timeout);
            if consumer.needs_toggle() {
                total = total.saturating_add(timings.update_settle_wait.saturating_mul(2));
            }
        }
    }
    total
}

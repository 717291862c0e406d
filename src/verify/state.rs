//! Per-unit state sequence

use std::fmt;

/// Where a (instance, base DN, supplier) unit is
///
/// Failures skip forward: a failed connect goes straight to `Done`, a
/// failed write jumps to `CleanedUp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnitState {
    Idle,
    Connected,
    GarbageChecked,
    Written,
    SettleWait,
    ConsumerLoop,
    CleanedUp,
    Disconnected,
    Done,
}

impl UnitState {
    pub fn name(&self) -> &'static str {
        match self {
            UnitState::Idle => "idle",
            UnitState::Connected => "connected",
            UnitState::GarbageChecked => "garbage_checked",
            UnitState::Written => "written",
            UnitState::SettleWait => "settle_wait",
            UnitState::ConsumerLoop => "consumer_loop",
            UnitState::CleanedUp => "cleaned_up",
            UnitState::Disconnected => "disconnected",
            UnitState::Done => "done",
        }
    }

    /// States only move forward
    pub fn can_advance_to(&self, next: UnitState) -> bool {
        next > *self
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

//! Observable events emitted by a replication check run
//!
//! Every log line carries exactly one event name. Directory actions share a
//! single event and are told apart by their `action` field.

use std::fmt;

/// Observable events in ds-repltest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Configuration file parsed and validated
    ConfigLoaded,
    /// Traversal of the topology begins
    RunStart,
    /// Traversal finished, result tree complete
    RunComplete,
    /// Traversal aborted by the canary invariant (FATAL)
    RunAborted,

    // Per supplier unit
    /// Work on one (instance, base DN, supplier) begins
    UnitBegin,
    /// Unit moved to the next state
    UnitState,
    /// Work on one unit finished
    UnitComplete,

    // Directory
    /// One directory action and its outcome
    DirectoryAction,
    /// Low level protocol detail
    DirectoryTrace,
    /// Agreement found switched off; forced update skipped
    AgreementDisabled,
    /// Forced update switched an agreement off and could not switch it back on
    AgreementLeftDisabled,

    // Collaborators
    /// Notification email handed to the transport
    NotificationSent,
    /// Notification email could not be sent
    NotificationFailed,
    /// Message sent to the service manager
    WatchdogNotify,
    /// Dashboard listening for requests
    DashboardServing,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::RunStart => "REPLTEST_RUN_BEGIN",
            Event::RunComplete => "REPLTEST_RUN_COMPLETE",
            Event::RunAborted => "REPLTEST_RUN_ABORTED",

            Event::UnitBegin => "UNIT_BEGIN",
            Event::UnitState => "UNIT_STATE",
            Event::UnitComplete => "UNIT_COMPLETE",

            Event::DirectoryAction => "DIRECTORY_ACTION",
            Event::DirectoryTrace => "DIRECTORY_TRACE",
            Event::AgreementDisabled => "REPLICA_AGREEMENT_DISABLED",
            Event::AgreementLeftDisabled => "REPLICA_AGREEMENT_LEFT_DISABLED",

            Event::NotificationSent => "NOTIFICATION_SENT",
            Event::NotificationFailed => "NOTIFICATION_FAILED",
            Event::WatchdogNotify => "WATCHDOG_NOTIFY",
            Event::DashboardServing => "DASHBOARD_SERVING",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::RunAborted)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! Observability subsystem for ds-repltest
//!
//! Provides:
//! - Structured logging (one JSON object per line)
//! - Typed lifecycle events
//! - Per-action records with unit context
//! - Stdout, file, syslog and in-memory sinks
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. A failing sink never fails the run
//! 3. The `Logger` is passed explicitly; there is no global logger
//!
//! # Usage
//!
//! ```ignore
//! use ds_repltest::observability::{Event, LogContext, Logger, Severity, StdoutSink};
//!
//! let logger = Logger::new(Severity::Info).with_sink(StdoutSink);
//! logger.info(Event::RunStart, &[("suppliers", "3")]);
//!
//! let ctx = LogContext::unit("main", "dc=example,dc=com").with("host", "ldap1");
//! logger.action(&ctx, "connect").success();
//! ```

mod action;
mod events;
mod logger;
mod sink;

pub use action::{ActionRecord, LogContext, LogFields};
pub use events::Event;
pub use logger::{Logger, Severity};
#[cfg(unix)]
pub use sink::SyslogSink;
pub use sink::{facility_code, FileSink, LogSink, MemorySink, StdoutSink};

/// Log a lifecycle event with fields
pub fn log_event(logger: &Logger, event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    logger.log(severity, event, fields);
}

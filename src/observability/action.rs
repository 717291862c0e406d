//! Per-action log records
//!
//! Every directory action is logged as one `DIRECTORY_ACTION` line carrying
//! the unit context (`instance`, `baseDN`), the host role (`host`,
//! `supplier`, `consumer`), the `action` name and a `status` of `success` or
//! `fail`, plus optional `error`/`detail`.

use super::events::Event;
use super::logger::{Logger, Severity};

/// Errors that know how to describe themselves as log fields
pub trait LogFields {
    /// `error` and optional `detail` fields
    fn log_fields(&self) -> Vec<(&'static str, String)>;
}

/// Fields shared by every line logged for one unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogContext {
    fields: Vec<(&'static str, String)>,
}

impl LogContext {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for one instance and base DN
    pub fn unit(instance: &str, base_dn: &str) -> Self {
        Self::new().with("instance", instance).with("baseDN", base_dn)
    }

    /// Copy of this context with one more field
    pub fn with(&self, key: &'static str, value: impl Into<String>) -> Self {
        let mut fields = self.fields.clone();
        fields.retain(|(k, _)| *k != key);
        fields.push((key, value.into()));
        Self { fields }
    }

    /// The context fields
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    /// Log a non-action event with the context fields attached
    pub fn log(&self, logger: &Logger, severity: Severity, event: Event, extra: &[(&str, &str)]) {
        let mut fields: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        fields.extend(extra.iter().copied());
        logger.log(severity, event, &fields);
    }
}

/// Builder for one `DIRECTORY_ACTION` line
#[must_use = "an action record logs nothing until success() or fail() is called"]
pub struct ActionRecord<'a> {
    logger: &'a Logger,
    fields: Vec<(&'static str, String)>,
}

impl Logger {
    /// Start an action record within a context
    pub fn action(&self, context: &LogContext, action: &str) -> ActionRecord<'_> {
        let mut fields = context.fields().to_vec();
        fields.push(("action", action.to_string()));
        ActionRecord {
            logger: self,
            fields,
        }
    }
}

impl<'a> ActionRecord<'a> {
    /// Attach a free-form detail
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.fields.retain(|(k, _)| *k != "detail");
        self.fields.push(("detail", detail.into()));
        self
    }

    /// Attach the fields of an error
    pub fn cause(mut self, err: &dyn LogFields) -> Self {
        for (key, value) in err.log_fields() {
            self.fields.retain(|(k, _)| *k != key);
            self.fields.push((key, value));
        }
        self
    }

    /// Log with `status=success` at INFO
    pub fn success(self) {
        self.emit(Severity::Info, "success");
    }

    /// Log with `status=fail` at ERROR
    pub fn fail(self) {
        self.emit(Severity::Error, "fail");
    }

    /// Log with `status=fail` at WARN, for best-effort steps
    pub fn fail_soft(self) {
        self.emit(Severity::Warn, "fail");
    }

    /// Log with `status=fail` at FATAL, for validation failures
    pub fn fatal(self) {
        self.emit(Severity::Fatal, "fail");
    }

    fn emit(self, severity: Severity, status: &str) {
        let mut fields: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        fields.push(("status", status));
        self.logger.log(severity, Event::DirectoryAction, &fields);
    }
}

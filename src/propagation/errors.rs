//! Propagation toggle errors

use std::fmt;

use thiserror::Error;

use crate::directory::DirectoryError;
use crate::observability::LogFields;

/// Result type for the propagation toggle
pub type ToggleResult<T> = Result<T, ToggleError>;

/// Which half of the toggle failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TogglePhase {
    /// Reading the current state; nothing was changed
    Check,
    /// `on -> off`
    Disable,
    /// `off -> on`
    Enable,
}

impl TogglePhase {
    /// Action name used in logs
    pub fn action(&self) -> &'static str {
        match self {
            TogglePhase::Check => "read replica",
            TogglePhase::Disable => "disable replica",
            TogglePhase::Enable => "enable replica",
        }
    }
}

impl fmt::Display for TogglePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TogglePhase::Check => write!(f, "check"),
            TogglePhase::Disable => write!(f, "disable"),
            TogglePhase::Enable => write!(f, "enable"),
        }
    }
}

/// A failed replica toggle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("can't {phase} replica agreement {agreement_dn}: {source}")]
pub struct ToggleError {
    pub phase: TogglePhase,
    pub agreement_dn: String,
    #[source]
    pub source: DirectoryError,
}

impl ToggleError {
    pub fn new(phase: TogglePhase, agreement_dn: &str, source: DirectoryError) -> Self {
        Self {
            phase,
            agreement_dn: agreement_dn.to_string(),
            source,
        }
    }

    /// True when the agreement was switched off and not back on
    pub fn left_disabled(&self) -> bool {
        self.phase == TogglePhase::Enable
    }
}

impl LogFields for ToggleError {
    fn log_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = self.source.log_fields();
        fields.push(("phase", self.phase.to_string()));
        fields
    }
}

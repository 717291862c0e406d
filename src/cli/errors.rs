//! CLI-specific error types
//!
//! Every CLI error ends the process; the code decides the exit status.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::verify::VerifyError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout, dashboard socket)
    IoError,
    /// Leftover canary entries stopped the run
    RunAborted,
    /// The run finished and found replication failures
    VerificationFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "REPLTEST_CLI_CONFIG_ERROR",
            Self::IoError => "REPLTEST_CLI_IO_ERROR",
            Self::RunAborted => "REPLTEST_CLI_RUN_ABORTED",
            Self::VerificationFailed => "REPLTEST_CLI_VERIFICATION_FAILED",
        }
    }

    /// Process exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigError | Self::IoError => 1,
            Self::VerificationFailed => 2,
            Self::RunAborted => 255,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Run stopped by the garbage invariant
    pub fn run_aborted(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::RunAborted, msg)
    }

    /// Replication check failed
    pub fn verification_failed() -> Self {
        Self::new(
            CliErrorCode::VerificationFailed,
            "Some errors occur. Check at the log for more details.",
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Process exit status
    pub fn exit_code(&self) -> i32 {
        self.code.exit_code()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<VerifyError> for CliError {
    fn from(e: VerifyError) -> Self {
        Self::run_aborted(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

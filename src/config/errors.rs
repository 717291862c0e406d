//! Configuration errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::topology::TopologyError;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors, all detected before a run starts
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid JSON or does not match the schema
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range or inconsistent
    #[error("invalid config: {0}")]
    Invalid(String),

    /// Topology or test entry rejected
    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),

    /// A log sink could not be opened
    #[error("cannot open {target} for logging: {source}")]
    LogSink {
        target: String,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

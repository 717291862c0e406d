//! Logging section

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigResult};
use crate::observability::{facility_code, FileSink, Logger, Severity, StdoutSink};

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    File,
    Syslog,
    Stdout,
}

/// `logging` section of the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(rename = "type", default = "default_log_type")]
    pub log_type: LogType,

    #[serde(default = "default_log_dir")]
    pub dir: String,

    #[serde(default = "default_log_file_name")]
    pub file_name: String,

    /// Also write to stdout, whatever the type
    #[serde(default)]
    pub stdout: bool,

    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_syslog_socket")]
    pub syslog_socket: String,

    #[serde(default = "default_syslog_facility")]
    pub syslog_facility: String,
}

fn default_log_type() -> LogType {
    LogType::Stdout
}
fn default_log_dir() -> String {
    "/var/log/ds-repltest".to_string()
}
fn default_log_file_name() -> String {
    "ds-repltest.log".to_string()
}
fn default_level() -> String {
    "INFO".to_string()
}
fn default_syslog_socket() -> String {
    "/dev/log".to_string()
}
fn default_syslog_facility() -> String {
    "local3".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_type: default_log_type(),
            dir: default_log_dir(),
            file_name: default_log_file_name(),
            stdout: false,
            level: default_level(),
            syslog_socket: default_syslog_socket(),
            syslog_facility: default_syslog_facility(),
        }
    }
}

/// Tag used in syslog frames
const SYSLOG_TAG: &str = "ds-repltest";

impl LoggingConfig {
    pub(super) fn validate(&self) -> ConfigResult<()> {
        self.severity()?;
        match self.log_type {
            LogType::File => {
                if self.file_name.trim().is_empty() {
                    return Err(ConfigError::invalid("logging.file_name must not be empty"));
                }
            }
            LogType::Syslog => {
                self.facility()?;
                if self.syslog_socket.trim().is_empty() {
                    return Err(ConfigError::invalid("logging.syslog_socket must not be empty"));
                }
            }
            LogType::Stdout => {}
        }
        Ok(())
    }

    /// Minimum severity
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.level.parse().map_err(|_| {
            ConfigError::invalid(format!(
                "Invalid logging.level: '{}'. Must be one of TRACE, INFO, WARN, ERROR, FATAL.",
                self.level
            ))
        })
    }

    fn facility(&self) -> ConfigResult<u8> {
        facility_code(&self.syslog_facility).ok_or_else(|| {
            ConfigError::invalid(format!(
                "Invalid logging.syslog_facility: '{}'",
                self.syslog_facility
            ))
        })
    }

    /// Full path of the log file
    pub fn file_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.file_name)
    }

    /// Build the logger with the configured sinks
    pub fn build_logger(&self) -> ConfigResult<Logger> {
        let mut logger = Logger::new(self.severity()?);
        match self.log_type {
            LogType::File => {
                let path = self.file_path();
                let sink = FileSink::open(&path).map_err(|source| ConfigError::LogSink {
                    target: path.display().to_string(),
                    source,
                })?;
                logger = logger.with_sink(sink);
            }
            LogType::Syslog => {
                logger = logger.with_sink(self.syslog_sink()?);
            }
            LogType::Stdout => {
                logger = logger.with_sink(StdoutSink);
            }
        }
        if self.stdout && self.log_type != LogType::Stdout {
            logger = logger.with_sink(StdoutSink);
        }
        Ok(logger)
    }

    #[cfg(unix)]
    fn syslog_sink(&self) -> ConfigResult<crate::observability::SyslogSink> {
        crate::observability::SyslogSink::connect(
            Path::new(&self.syslog_socket),
            self.facility()?,
            SYSLOG_TAG,
        )
        .map_err(|source| ConfigError::LogSink {
            target: self.syslog_socket.clone(),
            source,
        })
    }

    #[cfg(not(unix))]
    fn syslog_sink(&self) -> ConfigResult<StdoutSink> {
        let _ = SYSLOG_TAG;
        Err(ConfigError::invalid("syslog logging needs a unix socket"))
    }
}

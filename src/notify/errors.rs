//! Notification errors

use thiserror::Error;

/// Result type for notification
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Notification errors; never change the outcome of a run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// A sender or recipient address does not parse
    #[error("invalid address '{address}': {reason}")]
    Address { address: String, reason: String },

    /// The message could not be assembled
    #[error("failed to build email: {0}")]
    Build(String),

    /// The SMTP exchange failed
    #[error("failed to send email: {0}")]
    Transport(String),
}

//! Directory Error Types
//!
//! Every directory operation maps its outcome onto one of four kinds:
//! - `Connect`: the connection or the bind failed
//! - `NoSuchObject`: result code 32
//! - `AlreadyExists`: result code 68
//! - `Protocol`: any other result code or transport failure

use thiserror::Error;

use crate::observability::LogFields;

/// LDAP result code: noSuchObject
pub const RC_NO_SUCH_OBJECT: u32 = 32;

/// LDAP result code: entryAlreadyExists
pub const RC_ALREADY_EXISTS: u32 = 68;

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Directory operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Connection or simple bind failed
    #[error("cannot connect to {uri}: {description}")]
    Connect {
        uri: String,
        description: String,
        detail: Option<String>,
    },

    /// Generic protocol failure
    #[error("directory protocol error: {description}")]
    Protocol {
        /// Result code, `None` for transport failures
        code: Option<u32>,
        description: String,
        detail: Option<String>,
    },

    /// The target entry does not exist
    #[error("no such object: {dn}")]
    NoSuchObject { dn: String },

    /// The entry to add is already present
    #[error("entry already exists: {dn}")]
    AlreadyExists { dn: String },
}

impl DirectoryError {
    /// Connection failure
    pub fn connect(uri: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Connect {
            uri: uri.into(),
            description: description.into(),
            detail: None,
        }
    }

    /// Protocol failure without a result code
    pub fn protocol(description: impl Into<String>) -> Self {
        Self::Protocol {
            code: None,
            description: description.into(),
            detail: None,
        }
    }

    /// Map a non-zero LDAP result code to an error
    pub fn from_result_code(code: u32, dn: &str, text: &str) -> Self {
        let detail = non_empty(text);
        match code {
            RC_NO_SUCH_OBJECT => Self::NoSuchObject { dn: dn.to_string() },
            RC_ALREADY_EXISTS => Self::AlreadyExists { dn: dn.to_string() },
            _ => Self::Protocol {
                code: Some(code),
                description: result_code_description(code).to_string(),
                detail,
            },
        }
    }

    /// Turn a protocol-level failure into a connect failure for `uri`
    pub fn into_connect(self, uri: &str) -> Self {
        match self {
            connect @ Self::Connect { .. } => connect,
            Self::Protocol {
                description,
                detail,
                ..
            } => Self::Connect {
                uri: uri.to_string(),
                description,
                detail,
            },
            other => Self::Connect {
                uri: uri.to_string(),
                description: other.to_string(),
                detail: None,
            },
        }
    }

    /// Collapse the typed kinds into `Protocol`
    pub fn into_protocol(self) -> Self {
        match self {
            Self::NoSuchObject { ref dn } => Self::Protocol {
                code: Some(RC_NO_SUCH_OBJECT),
                description: result_code_description(RC_NO_SUCH_OBJECT).to_string(),
                detail: Some(dn.clone()),
            },
            Self::AlreadyExists { ref dn } => Self::Protocol {
                code: Some(RC_ALREADY_EXISTS),
                description: result_code_description(RC_ALREADY_EXISTS).to_string(),
                detail: Some(dn.clone()),
            },
            other => other,
        }
    }

    /// Short description as the server reported it
    pub fn description(&self) -> &str {
        match self {
            Self::Connect { description, .. } | Self::Protocol { description, .. } => description,
            Self::NoSuchObject { .. } => result_code_description(RC_NO_SUCH_OBJECT),
            Self::AlreadyExists { .. } => result_code_description(RC_ALREADY_EXISTS),
        }
    }

    /// Additional server-provided information
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Connect { detail, .. } | Self::Protocol { detail, .. } => detail.as_deref(),
            Self::NoSuchObject { dn } | Self::AlreadyExists { dn } => Some(dn),
        }
    }

    /// Kind name for reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Protocol { .. } => "protocol",
            Self::NoSuchObject { .. } => "no_such_object",
            Self::AlreadyExists { .. } => "already_exists",
        }
    }
}

impl LogFields for DirectoryError {
    fn log_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("error", sanitize(self.description()))];
        if let Some(detail) = self.detail() {
            fields.push(("detail", sanitize(detail)));
        }
        fields
    }
}

/// Human description of an LDAP result code (RFC 4511 §4.1.9)
pub fn result_code_description(code: u32) -> &'static str {
    match code {
        0 => "Success",
        1 => "Operations error",
        2 => "Protocol error",
        3 => "Time limit exceeded",
        4 => "Size limit exceeded",
        7 => "Authentication method not supported",
        8 => "Strong(er) authentication required",
        10 => "Referral",
        11 => "Administrative limit exceeded",
        16 => "No such attribute",
        17 => "Undefined attribute type",
        19 => "Constraint violation",
        20 => "Type or value exists",
        21 => "Invalid syntax",
        32 => "No such object",
        34 => "Invalid DN syntax",
        48 => "Inappropriate authentication",
        49 => "Invalid credentials",
        50 => "Insufficient access",
        51 => "Server is busy",
        52 => "Server is unavailable",
        53 => "Server is unwilling to perform",
        64 => "Naming violation",
        65 => "Object class violation",
        66 => "Operation not allowed on non-leaf",
        67 => "Operation not allowed on RDN",
        68 => "Already exists",
        80 => "Other (e.g., implementation specific) error",
        _ => "Unknown result code",
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// Server messages often carry trailing newlines
fn sanitize(value: &str) -> String {
    value.trim_end().to_string()
}

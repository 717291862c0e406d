//! Topology Error Types
//!
//! Topology and test entry problems are configuration errors: they are
//! detected once, at load time, and never during a run.

use thiserror::Error;

/// Result type for topology construction
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Topology and test entry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The test entry has neither `uid` nor `cn`
    #[error("the rdn of the test entry is not 'cn' or 'uid'")]
    MissingNamingAttribute,

    /// The naming attribute must carry exactly one value
    #[error("naming attribute '{attribute}' must have exactly one value, found {count}")]
    NamingValueCount { attribute: String, count: usize },

    /// The naming value would need escaping inside a DN
    #[error("naming value '{value}' of '{attribute}' contains characters reserved in a DN")]
    UnsafeNamingValue { attribute: String, value: String },

    /// Unsupported protocol scheme
    #[error("unsupported protocol '{0}', expected 'ldap' or 'ldaps'")]
    UnknownProtocol(String),

    /// A name that must not be blank is blank
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// The same supplier appears twice under one base DN
    #[error("supplier '{supplier}' listed twice under '{base_dn}'")]
    DuplicateSupplier { base_dn: String, supplier: String },

    /// The same consumer appears twice for one supplier
    #[error("consumer '{consumer}' listed twice for supplier '{supplier}'")]
    DuplicateConsumer { supplier: String, consumer: String },
}

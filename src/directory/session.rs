//! Directory backend traits
//!
//! `Directory` opens bound sessions; `DirectorySession` runs the raw
//! operations on one of them. Backends report raw outcomes (a missing base
//! object is `NoSuchObject`); the client layer applies the semantics the
//! verification engine relies on.

use std::fmt;
use std::time::Duration;

use super::errors::DirectoryResult;
use super::modlist::Modification;

/// Search scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// The base object only
    #[default]
    Base,
    /// Immediate children of the base object
    OneLevel,
    /// The base object and its whole subtree
    Subtree,
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchScope::Base => "base",
            SearchScope::OneLevel => "one",
            SearchScope::Subtree => "sub",
        };
        write!(f, "{}", name)
    }
}

/// Bind parameters for one connection
#[derive(Clone, PartialEq, Eq)]
pub struct BindRequest<'a> {
    /// `<protocol>://<host>:<port>`
    pub uri: &'a str,
    /// Empty for an anonymous bind
    pub bind_dn: &'a str,
    pub bind_pw: &'a str,
    /// Connect and per-operation timeout
    pub timeout: Duration,
}

impl BindRequest<'_> {
    /// True when no bind DN was given
    pub fn is_anonymous(&self) -> bool {
        self.bind_dn.is_empty()
    }
}

impl fmt::Debug for BindRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindRequest")
            .field("uri", &self.uri)
            .field("bind_dn", &self.bind_dn)
            .field("bind_pw", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A directory backend able to open bound sessions
pub trait Directory {
    /// Connect and perform a simple bind (protocol version 3)
    fn open(&self, request: &BindRequest<'_>) -> DirectoryResult<Box<dyn DirectorySession>>;
}

/// One bound connection
pub trait DirectorySession {
    /// Number of entries matching `filter`
    fn search(&mut self, base_dn: &str, scope: SearchScope, filter: &str) -> DirectoryResult<usize>;

    /// Add an entry
    fn add(&mut self, dn: &str, attributes: &[(String, Vec<String>)]) -> DirectoryResult<()>;

    /// Delete an entry
    fn delete(&mut self, dn: &str) -> DirectoryResult<()>;

    /// Apply a change list to an entry
    fn modify(&mut self, dn: &str, changes: &[Modification]) -> DirectoryResult<()>;

    /// Unbind and close
    fn unbind(&mut self) -> DirectoryResult<()>;
}

impl<D: Directory + ?Sized> Directory for &D {
    fn open(&self, request: &BindRequest<'_>) -> DirectoryResult<Box<dyn DirectorySession>> {
        (**self).open(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scope_is_base() {
        assert_eq!(SearchScope::default(), SearchScope::Base);
        assert_eq!(SearchScope::Subtree.to_string(), "sub");
    }

    #[test]
    fn test_bind_request_redacts_password() {
        let request = BindRequest {
            uri: "ldap://ldap1:389",
            bind_dn: "cn=Directory Manager",
            bind_pw: "secret",
            timeout: Duration::from_secs(5),
        };
        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("secret"));
        assert!(!request.is_anonymous());
    }
}

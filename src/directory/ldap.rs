//! LDAP backend built on `ldap3`'s synchronous connection
//!
//! `ldap3` speaks protocol version 3 only, which is what the suppliers and
//! consumers expect. Every operation runs with the configured timeout.

use std::collections::HashSet;
use std::time::Duration;

use ldap3::{LdapConn, LdapConnSettings, LdapError, Mod, Scope};

use super::errors::{DirectoryError, DirectoryResult};
use super::modlist::Modification;
use super::session::{BindRequest, Directory, DirectorySession, SearchScope};

/// Directory backend talking to real servers
#[derive(Debug, Clone, Copy, Default)]
pub struct LdapDirectory;

impl LdapDirectory {
    pub fn new() -> Self {
        Self
    }
}

impl Directory for LdapDirectory {
    fn open(&self, request: &BindRequest<'_>) -> DirectoryResult<Box<dyn DirectorySession>> {
        let settings = LdapConnSettings::new().set_conn_timeout(request.timeout);
        let mut conn = LdapConn::with_settings(settings, request.uri)
            .map_err(|e| map_error(e, "").into_connect(request.uri))?;

        let bound = conn
            .with_timeout(request.timeout)
            .simple_bind(request.bind_dn, request.bind_pw)
            .and_then(|result| result.success());
        if let Err(e) = bound {
            let _ = conn.unbind();
            return Err(map_error(e, request.bind_dn).into_connect(request.uri));
        }

        Ok(Box::new(LdapSession {
            conn,
            timeout: request.timeout,
        }))
    }
}

struct LdapSession {
    conn: LdapConn,
    timeout: Duration,
}

impl DirectorySession for LdapSession {
    fn search(&mut self, base_dn: &str, scope: SearchScope, filter: &str) -> DirectoryResult<usize> {
        // "1.1" asks for no attributes; only the count matters
        let (entries, _) = self
            .conn
            .with_timeout(self.timeout)
            .search(base_dn, ldap_scope(scope), filter, vec!["1.1"])
            .and_then(|result| result.success())
            .map_err(|e| map_error(e, base_dn))?;
        Ok(entries.len())
    }

    fn add(&mut self, dn: &str, attributes: &[(String, Vec<String>)]) -> DirectoryResult<()> {
        let attrs: Vec<(&str, HashSet<&str>)> = attributes
            .iter()
            .map(|(attr, values)| (attr.as_str(), values.iter().map(String::as_str).collect()))
            .collect();
        self.conn
            .with_timeout(self.timeout)
            .add(dn, attrs)
            .and_then(|result| result.success())
            .map(|_| ())
            .map_err(|e| map_error(e, dn))
    }

    fn delete(&mut self, dn: &str) -> DirectoryResult<()> {
        self.conn
            .with_timeout(self.timeout)
            .delete(dn)
            .and_then(|result| result.success())
            .map(|_| ())
            .map_err(|e| map_error(e, dn))
    }

    fn modify(&mut self, dn: &str, changes: &[Modification]) -> DirectoryResult<()> {
        let mods: Vec<Mod<&str>> = changes.iter().map(ldap_mod).collect();
        self.conn
            .with_timeout(self.timeout)
            .modify(dn, mods)
            .and_then(|result| result.success())
            .map(|_| ())
            .map_err(|e| map_error(e, dn))
    }

    fn unbind(&mut self) -> DirectoryResult<()> {
        self.conn.unbind().map_err(|e| map_error(e, ""))
    }
}

fn ldap_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

fn ldap_mod(change: &Modification) -> Mod<&str> {
    fn values(values: &[String]) -> HashSet<&str> {
        values.iter().map(String::as_str).collect()
    }
    match change {
        Modification::Add(attr, vals) => Mod::Add(attr.as_str(), values(vals)),
        Modification::Delete(attr, vals) => Mod::Delete(attr.as_str(), values(vals)),
        Modification::Replace(attr, vals) => Mod::Replace(attr.as_str(), values(vals)),
    }
}

fn map_error(err: LdapError, dn: &str) -> DirectoryError {
    match err {
        LdapError::LdapResult { result } => {
            DirectoryError::from_result_code(result.rc, dn, &result.text)
        }
        other => DirectoryError::protocol(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_mapping() {
        assert!(matches!(ldap_scope(SearchScope::Base), Scope::Base));
        assert!(matches!(ldap_scope(SearchScope::Subtree), Scope::Subtree));
    }

    #[test]
    fn test_mod_mapping() {
        let change = Modification::Replace("nsds5ReplicaEnabled".to_string(), vec!["off".to_string()]);
        match ldap_mod(&change) {
            Mod::Replace(attr, values) => {
                assert_eq!(attr, "nsds5ReplicaEnabled");
                assert!(values.contains("off"));
            }
            _ => panic!("expected replace"),
        }
    }

    #[test]
    fn test_unreachable_server_is_connect_error() {
        // Port 9 on localhost is discard; nothing speaks LDAP there
        let request = BindRequest {
            uri: "ldap://127.0.0.1:9",
            bind_dn: "",
            bind_pw: "",
            timeout: Duration::from_millis(200),
        };
        let err = LdapDirectory::new().open(&request).err().unwrap();
        assert!(matches!(err, DirectoryError::Connect { .. }));
    }
}

//! In-memory directory backend
//!
//! Simulates a set of directory hosts, the replication links between them,
//! and faults. Used to drive the verification engine without real servers.
//!
//! Replication links come in three flavours:
//! - `Immediate`: adds and deletes reach the consumer at once
//! - `OnEnable`: the consumer catches up when the agreement's
//!   `nsds5ReplicaEnabled` flips back to `on`
//! - `Broken`: nothing ever arrives

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::{DirectoryError, DirectoryResult};
use super::modlist::{lookup, Attributes, Modification};
use super::session::{BindRequest, Directory, DirectorySession, SearchScope};
use crate::propagation::REPLICA_ENABLED_ATTR;

/// Operation kinds, for fault injection and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Bind,
    Search,
    Add,
    Delete,
    Modify,
    Unbind,
}

/// One recorded operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub host: String,
    pub kind: OpKind,
    /// Target DN, empty for bind/unbind
    pub dn: String,
}

/// How a supplier pushes to a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    Immediate,
    OnEnable,
    Broken,
}

#[derive(Debug, Clone)]
struct Link {
    supplier: String,
    consumer: String,
    agreement_dn: Option<String>,
    mode: LinkMode,
}

#[derive(Debug, Default)]
struct Host {
    /// Keyed by normalized DN
    entries: BTreeMap<String, Attributes>,
    reachable: bool,
    fail_all: Vec<OpKind>,
    fail_nth: Vec<(OpKind, usize)>,
    counts: HashMap<OpKind, usize>,
    search_overrides: HashMap<String, usize>,
}

#[derive(Debug, Default)]
struct State {
    hosts: BTreeMap<String, Host>,
    links: Vec<Link>,
    operations: Vec<Operation>,
}

/// Shared in-memory directory; clones see the same hosts
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<Mutex<State>>,
}

fn normalize(dn: &str) -> String {
    dn.split(',')
        .map(|rdn| rdn.trim().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

fn host_of(uri: &str) -> &str {
    let rest = uri.split_once("://").map(|(_, rest)| rest).unwrap_or(uri);
    let end = rest.find(|c| c == ':' || c == '/').unwrap_or(rest.len());
    &rest[..end]
}

fn is_config_entry(dn: &str) -> bool {
    normalize(dn).ends_with("cn=config")
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a reachable host with no entries
    pub fn add_host(&self, host: &str) {
        self.lock().hosts.insert(
            host.to_string(),
            Host {
                reachable: true,
                ..Host::default()
            },
        );
    }

    /// Make a host refuse connections
    pub fn set_unreachable(&self, host: &str) {
        if let Some(h) = self.lock().hosts.get_mut(host) {
            h.reachable = false;
        }
    }

    /// Fail every operation of `kind` on `host`
    pub fn fail(&self, host: &str, kind: OpKind) {
        if let Some(h) = self.lock().hosts.get_mut(host) {
            h.fail_all.push(kind);
        }
    }

    /// Fail only the `n`th (1-based) operation of `kind` on `host`
    pub fn fail_nth(&self, host: &str, kind: OpKind, n: usize) {
        if let Some(h) = self.lock().hosts.get_mut(host) {
            h.fail_nth.push((kind, n));
        }
    }

    /// Make base searches on `dn` report `count` entries
    pub fn override_search_count(&self, host: &str, dn: &str, count: usize) {
        if let Some(h) = self.lock().hosts.get_mut(host) {
            h.search_overrides.insert(normalize(dn), count);
        }
    }

    /// Store an entry directly, bypassing replication
    pub fn insert_entry(&self, host: &str, dn: &str, entry: Attributes) {
        if let Some(h) = self.lock().hosts.get_mut(host) {
            h.entries.insert(normalize(dn), entry);
        }
    }

    /// Read an entry
    pub fn entry(&self, host: &str, dn: &str) -> Option<Attributes> {
        self.lock()
            .hosts
            .get(host)
            .and_then(|h| h.entries.get(&normalize(dn)).cloned())
    }

    /// True when `host` holds `dn`
    pub fn contains(&self, host: &str, dn: &str) -> bool {
        self.entry(host, dn).is_some()
    }

    /// Adds and deletes on `supplier` reach `consumer` at once
    pub fn link_immediate(&self, supplier: &str, consumer: &str) {
        self.lock().links.push(Link {
            supplier: supplier.to_string(),
            consumer: consumer.to_string(),
            agreement_dn: None,
            mode: LinkMode::Immediate,
        });
    }

    /// Create an enabled agreement entry on `supplier` pushing to `consumer`
    pub fn add_agreement(&self, supplier: &str, consumer: &str, agreement_dn: &str, mode: LinkMode) {
        let mut state = self.lock();
        if let Some(h) = state.hosts.get_mut(supplier) {
            let mut entry = Attributes::new();
            entry.insert(
                "objectClass".to_string(),
                vec!["top".to_string(), "nsds5replicationagreement".to_string()],
            );
            entry.insert("nsDS5ReplicaHost".to_string(), vec![consumer.to_string()]);
            entry.insert(REPLICA_ENABLED_ATTR.to_string(), vec!["on".to_string()]);
            h.entries.insert(normalize(agreement_dn), entry);
        }
        state.links.push(Link {
            supplier: supplier.to_string(),
            consumer: consumer.to_string(),
            agreement_dn: Some(normalize(agreement_dn)),
            mode,
        });
    }

    /// Every recorded operation, in order
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    /// Recorded operations of `kind` on `host`
    pub fn count_ops(&self, host: &str, kind: OpKind) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| op.host == host && op.kind == kind)
            .count()
    }

    /// True when any operation touched `host`
    pub fn touched(&self, host: &str) -> bool {
        self.lock().operations.iter().any(|op| op.host == host)
    }
}

impl State {
    /// Record the operation and apply injected faults
    fn enter(&mut self, host: &str, kind: OpKind, dn: &str) -> DirectoryResult<()> {
        self.operations.push(Operation {
            host: host.to_string(),
            kind,
            dn: dn.to_string(),
        });
        let h = self
            .hosts
            .get_mut(host)
            .ok_or_else(|| DirectoryError::protocol("Can't contact LDAP server"))?;
        if !h.reachable {
            return Err(DirectoryError::protocol("Can't contact LDAP server"));
        }
        let count = h.counts.entry(kind).or_insert(0);
        *count += 1;
        let nth = *count;
        if h.fail_all.contains(&kind) || h.fail_nth.contains(&(kind, nth)) {
            return Err(DirectoryError::from_result_code(
                53,
                dn,
                "injected failure",
            ));
        }
        Ok(())
    }

    fn links_from(&self, supplier: &str, mode: LinkMode) -> Vec<String> {
        self.links
            .iter()
            .filter(|l| l.supplier == supplier && l.mode == mode)
            .map(|l| l.consumer.clone())
            .collect()
    }

    fn replicate_add(&mut self, supplier: &str, key: &str, entry: &Attributes) {
        for consumer in self.links_from(supplier, LinkMode::Immediate) {
            if let Some(h) = self.hosts.get_mut(&consumer) {
                h.entries.insert(key.to_string(), entry.clone());
            }
        }
    }

    fn replicate_delete(&mut self, supplier: &str, key: &str) {
        for consumer in self.links_from(supplier, LinkMode::Immediate) {
            if let Some(h) = self.hosts.get_mut(&consumer) {
                h.entries.remove(key);
            }
        }
    }

    /// Bring `consumer` in line with `supplier`'s data entries
    fn catch_up(&mut self, supplier: &str, consumer: &str) {
        let data: BTreeMap<String, Attributes> = match self.hosts.get(supplier) {
            Some(h) => h
                .entries
                .iter()
                .filter(|(dn, _)| !is_config_entry(dn))
                .map(|(dn, e)| (dn.clone(), e.clone()))
                .collect(),
            None => return,
        };
        if let Some(h) = self.hosts.get_mut(consumer) {
            h.entries.retain(|dn, _| is_config_entry(dn));
            h.entries.extend(data);
        }
    }

    fn agreement_enabled(&mut self, supplier: &str, key: &str) {
        let consumers: Vec<String> = self
            .links
            .iter()
            .filter(|l| {
                l.supplier == supplier
                    && l.mode == LinkMode::OnEnable
                    && l.agreement_dn.as_deref() == Some(key)
            })
            .map(|l| l.consumer.clone())
            .collect();
        for consumer in consumers {
            self.catch_up(supplier, &consumer);
        }
    }
}

impl Directory for MemoryDirectory {
    fn open(&self, request: &BindRequest<'_>) -> DirectoryResult<Box<dyn DirectorySession>> {
        let host = host_of(request.uri).to_string();
        self.lock()
            .enter(&host, OpKind::Bind, "")
            .map_err(|e| e.into_connect(request.uri))?;
        Ok(Box::new(MemorySession {
            host,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemorySession {
    host: String,
    state: Arc<Mutex<State>>,
}

impl MemorySession {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DirectorySession for MemorySession {
    fn search(&mut self, base_dn: &str, scope: SearchScope, filter: &str) -> DirectoryResult<usize> {
        let mut state = self.lock();
        state.enter(&self.host, OpKind::Search, base_dn)?;
        let key = normalize(base_dn);
        let host = state
            .hosts
            .get(&self.host)
            .ok_or_else(|| DirectoryError::protocol("Can't contact LDAP server"))?;
        if let Some(count) = host.search_overrides.get(&key) {
            return Ok(*count);
        }
        if !host.entries.contains_key(&key) {
            return Err(DirectoryError::NoSuchObject {
                dn: base_dn.to_string(),
            });
        }
        let suffix = format!(",{}", key);
        let in_scope = |dn: &str| match scope {
            SearchScope::Base => dn == key,
            SearchScope::OneLevel => dn
                .strip_suffix(&suffix)
                .map(|rdn| !rdn.contains(','))
                .unwrap_or(false),
            SearchScope::Subtree => dn == key || dn.ends_with(&suffix),
        };
        let count = host
            .entries
            .iter()
            .filter(|(dn, entry)| in_scope(dn.as_str()) && matches_filter(entry, filter))
            .count();
        Ok(count)
    }

    fn add(&mut self, dn: &str, attributes: &[(String, Vec<String>)]) -> DirectoryResult<()> {
        let mut state = self.lock();
        state.enter(&self.host, OpKind::Add, dn)?;
        let key = normalize(dn);
        let entry: Attributes = attributes.iter().cloned().collect();
        let host = state
            .hosts
            .get_mut(&self.host)
            .ok_or_else(|| DirectoryError::protocol("Can't contact LDAP server"))?;
        if host.entries.contains_key(&key) {
            return Err(DirectoryError::AlreadyExists { dn: dn.to_string() });
        }
        host.entries.insert(key.clone(), entry.clone());
        state.replicate_add(&self.host, &key, &entry);
        Ok(())
    }

    fn delete(&mut self, dn: &str) -> DirectoryResult<()> {
        let mut state = self.lock();
        state.enter(&self.host, OpKind::Delete, dn)?;
        let key = normalize(dn);
        let host = state
            .hosts
            .get_mut(&self.host)
            .ok_or_else(|| DirectoryError::protocol("Can't contact LDAP server"))?;
        if host.entries.remove(&key).is_none() {
            return Err(DirectoryError::NoSuchObject { dn: dn.to_string() });
        }
        state.replicate_delete(&self.host, &key);
        Ok(())
    }

    fn modify(&mut self, dn: &str, changes: &[Modification]) -> DirectoryResult<()> {
        let mut state = self.lock();
        state.enter(&self.host, OpKind::Modify, dn)?;
        let key = normalize(dn);
        let host = state
            .hosts
            .get_mut(&self.host)
            .ok_or_else(|| DirectoryError::protocol("Can't contact LDAP server"))?;
        let entry = host
            .entries
            .get_mut(&key)
            .ok_or_else(|| DirectoryError::NoSuchObject { dn: dn.to_string() })?;

        let was_enabled = enabled(entry);
        for change in changes {
            apply(entry, change);
        }
        let now_enabled = enabled(entry);

        if !was_enabled && now_enabled {
            state.agreement_enabled(&self.host, &key);
        }
        Ok(())
    }

    fn unbind(&mut self) -> DirectoryResult<()> {
        self.lock().enter(&self.host, OpKind::Unbind, "")
    }
}

/// Presence `(attr=*)` and equality `(attr=value)` filters; anything else
/// matches every entry
fn matches_filter(entry: &Attributes, filter: &str) -> bool {
    let inner = filter.trim().trim_start_matches('(').trim_end_matches(')');
    let (attr, value) = match inner.split_once('=') {
        Some(pair) => pair,
        None => return true,
    };
    if value == "*" {
        return attr.eq_ignore_ascii_case("objectclass") || lookup(entry, attr).is_some();
    }
    lookup(entry, attr)
        .map(|values| values.iter().any(|v| v.eq_ignore_ascii_case(value)))
        .unwrap_or(false)
}

fn enabled(entry: &Attributes) -> bool {
    lookup(entry, REPLICA_ENABLED_ATTR)
        .map(|values| values.iter().any(|v| v.eq_ignore_ascii_case("on")))
        .unwrap_or(false)
}

fn apply(entry: &mut Attributes, change: &Modification) {
    let existing = entry
        .keys()
        .find(|name| name.eq_ignore_ascii_case(change.attribute()))
        .cloned();
    match change {
        Modification::Add(attr, values) => {
            let slot = entry.entry(existing.unwrap_or_else(|| attr.clone())).or_default();
            for v in values {
                if !slot.contains(v) {
                    slot.push(v.clone());
                }
            }
        }
        Modification::Delete(_, values) => {
            if let Some(name) = existing {
                if values.is_empty() {
                    entry.remove(&name);
                } else if let Some(slot) = entry.get_mut(&name) {
                    slot.retain(|v| !values.contains(v));
                    if slot.is_empty() {
                        entry.remove(&name);
                    }
                }
            }
        }
        Modification::Replace(attr, values) => {
            if let Some(name) = existing {
                entry.remove(&name);
            }
            if !values.is_empty() {
                entry.insert(attr.clone(), values.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const AGREEMENT: &str = "cn=to-c1,cn=replica,cn=mapping tree,cn=config";

    fn bind<'a>(uri: &'a str) -> BindRequest<'a> {
        BindRequest {
            uri,
            bind_dn: "",
            bind_pw: "",
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("ldap://ldap1.example.com:389"), "ldap1.example.com");
        assert_eq!(host_of("ldaps://ldap2/"), "ldap2");
        assert_eq!(host_of("ldap3"), "ldap3");
    }

    #[test]
    fn test_immediate_link_replicates_add_and_delete() {
        let dir = MemoryDirectory::new();
        dir.add_host("s1");
        dir.add_host("c1");
        dir.link_immediate("s1", "c1");

        let mut session = dir.open(&bind("ldap://s1:389")).unwrap();
        session
            .add("uid=x,o=t", &[("uid".to_string(), vec!["x".to_string()])])
            .unwrap();
        assert!(dir.contains("c1", "UID=x, o=t"));

        session.delete("uid=x,o=t").unwrap();
        assert!(!dir.contains("c1", "uid=x,o=t"));
    }

    #[test]
    fn test_on_enable_link_catches_up_on_enable() {
        let dir = MemoryDirectory::new();
        dir.add_host("s1");
        dir.add_host("c1");
        dir.add_agreement("s1", "c1", AGREEMENT, LinkMode::OnEnable);

        let mut session = dir.open(&bind("ldap://s1:389")).unwrap();
        session
            .add("uid=x,o=t", &[("uid".to_string(), vec!["x".to_string()])])
            .unwrap();
        assert!(!dir.contains("c1", "uid=x,o=t"));

        let off = Modification::Replace(REPLICA_ENABLED_ATTR.to_string(), vec!["off".to_string()]);
        let on = Modification::Replace(REPLICA_ENABLED_ATTR.to_string(), vec!["on".to_string()]);
        session.modify(AGREEMENT, &[off]).unwrap();
        assert!(!dir.contains("c1", "uid=x,o=t"));
        session.modify(AGREEMENT, &[on]).unwrap();
        assert!(dir.contains("c1", "uid=x,o=t"));
    }

    #[test]
    fn test_fail_nth_only_fails_once() {
        let dir = MemoryDirectory::new();
        dir.add_host("s1");
        dir.fail_nth("s1", OpKind::Search, 2);

        let mut session = dir.open(&bind("ldap://s1")).unwrap();
        assert!(session.search("o=t", SearchScope::Base, "(objectclass=*)").is_err());
        let second = session.search("o=t", SearchScope::Base, "(objectclass=*)");
        assert!(matches!(second, Err(DirectoryError::Protocol { code: Some(53), .. })));
        let third = session.search("o=t", SearchScope::Base, "(objectclass=*)");
        assert!(matches!(third, Err(DirectoryError::NoSuchObject { .. })));
    }

    #[test]
    fn test_unreachable_host_refuses_bind() {
        let dir = MemoryDirectory::new();
        dir.add_host("s1");
        dir.set_unreachable("s1");
        let err = dir.open(&bind("ldap://s1:389")).err().unwrap();
        assert!(matches!(err, DirectoryError::Connect { .. }));
        assert_eq!(dir.count_ops("s1", OpKind::Bind), 1);
    }

    #[test]
    fn test_search_override() {
        let dir = MemoryDirectory::new();
        dir.add_host("s1");
        dir.override_search_count("s1", "uid=x,o=t", 2);
        let mut session = dir.open(&bind("ldap://s1")).unwrap();
        assert_eq!(session.search("uid=x,o=t", SearchScope::Base, "(objectclass=*)").unwrap(), 2);
    }

    #[test]
    fn test_search_equality_filter() {
        let dir = MemoryDirectory::new();
        dir.add_host("s1");
        dir.add_host("c1");
        dir.add_agreement("s1", "c1", AGREEMENT, LinkMode::OnEnable);
        let mut session = dir.open(&bind("ldap://s1")).unwrap();

        let on = format!("({}=on)", REPLICA_ENABLED_ATTR);
        let off = format!("({}=off)", REPLICA_ENABLED_ATTR);
        assert_eq!(session.search(AGREEMENT, SearchScope::Base, &on).unwrap(), 1);
        assert_eq!(session.search(AGREEMENT, SearchScope::Base, &off).unwrap(), 0);
        assert_eq!(session.search(AGREEMENT, SearchScope::Base, "(objectclass=*)").unwrap(), 1);
    }
}

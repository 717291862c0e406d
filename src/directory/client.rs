//! Directory client primitives
//!
//! Thin wrappers over a `DirectorySession` that give every operation the
//! outcome the verification engine expects:
//! - `search` counts entries and treats a missing base object as zero
//! - `add` distinguishes `AlreadyExists`, `delete` distinguishes `NoSuchObject`
//! - `modify` takes before/after attribute sets
//! - `disconnect` never fails
//!
//! A `Connection` unbinds itself when dropped, so no exit path leaks it.

use std::time::Duration;

use super::errors::{DirectoryError, DirectoryResult};
use super::modlist::{add_list, modify_list, Attributes};
use super::session::{BindRequest, Directory, DirectorySession, SearchScope};
use crate::observability::{Event, LogContext, Logger, Severity};

/// Filter matching any entry
pub const ANY_OBJECT_FILTER: &str = "(objectclass=*)";

/// One bound connection to a directory server
pub struct Connection {
    uri: String,
    session: Option<Box<dyn DirectorySession>>,
}

impl Connection {
    /// Wrap an already bound session
    pub fn new(uri: impl Into<String>, session: Box<dyn DirectorySession>) -> Self {
        Self {
            uri: uri.into(),
            session: Some(session),
        }
    }

    /// Server URI this connection is bound to
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// False once the connection has been unbound
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn session(&mut self) -> DirectoryResult<&mut (dyn DirectorySession + 'static)> {
        match self.session.as_mut() {
            Some(session) => Ok(&mut **session),
            None => Err(DirectoryError::protocol(format!(
                "connection to {} already closed",
                self.uri
            ))),
        }
    }

    fn close(&mut self) -> DirectoryResult<()> {
        match self.session.take() {
            Some(mut session) => session.unbind(),
            None => Ok(()),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("uri", &self.uri)
            .field("open", &self.is_open())
            .finish()
    }
}

fn trace(logger: &Logger, ctx: &LogContext, message: &str) {
    ctx.log(logger, Severity::Trace, Event::DirectoryTrace, &[("message", message)]);
}

/// Connect and simple-bind; an empty `bind_dn` binds anonymously
pub fn connect<D: Directory + ?Sized>(
    directory: &D,
    uri: &str,
    bind_dn: &str,
    bind_pw: &str,
    timeout: Duration,
    logger: &Logger,
    ctx: &LogContext,
) -> DirectoryResult<Connection> {
    trace(logger, ctx, &format!("Connecting to {}", uri));
    let request = BindRequest {
        uri,
        bind_dn,
        bind_pw: if bind_dn.is_empty() { "" } else { bind_pw },
        timeout,
    };
    if request.is_anonymous() {
        trace(logger, ctx, "Binding anonymously");
    } else {
        trace(logger, ctx, &format!("Binding with {}", bind_dn));
    }

    match directory.open(&request) {
        Ok(session) => Ok(Connection::new(uri, session)),
        Err(err) => {
            let err = err.into_connect(uri);
            trace(
                logger,
                ctx,
                &format!("Bind failed. {}", err.description()),
            );
            Err(err)
        }
    }
}

/// Count entries under `base_dn`; a missing base object counts as zero
pub fn search(
    conn: &mut Connection,
    base_dn: &str,
    scope: SearchScope,
    filter: &str,
    logger: &Logger,
    ctx: &LogContext,
) -> DirectoryResult<usize> {
    trace(
        logger,
        ctx,
        &format!("Searching {} scope={} filter={}", base_dn, scope, filter),
    );
    match conn.session()?.search(base_dn, scope, filter) {
        Ok(count) => Ok(count),
        Err(DirectoryError::NoSuchObject { .. }) => Ok(0),
        Err(err) => Err(err.into_protocol()),
    }
}

/// Add an entry
pub fn add(
    conn: &mut Connection,
    dn: &str,
    entry: &Attributes,
    logger: &Logger,
    ctx: &LogContext,
) -> DirectoryResult<()> {
    let list = add_list(entry);
    match conn.session()?.add(dn, &list) {
        Ok(()) => Ok(()),
        Err(err @ DirectoryError::AlreadyExists { .. }) => {
            trace(
                logger,
                ctx,
                &format!("Can't add. The dn <{}> already exists.", dn),
            );
            Err(err)
        }
        Err(err) => {
            let err = err.into_protocol();
            trace(
                logger,
                ctx,
                &format!("Can't add the dn <{}>. Error: {}", dn, err.description()),
            );
            Err(err)
        }
    }
}

/// Delete an entry
pub fn delete(
    conn: &mut Connection,
    dn: &str,
    logger: &Logger,
    ctx: &LogContext,
) -> DirectoryResult<()> {
    match conn.session()?.delete(dn) {
        Ok(()) => Ok(()),
        Err(err @ DirectoryError::NoSuchObject { .. }) => {
            trace(
                logger,
                ctx,
                &format!("Can't delete. The dn <{}> doesn't exist.", dn),
            );
            Err(err)
        }
        Err(err) => {
            let err = err.into_protocol();
            trace(
                logger,
                ctx,
                &format!("Can't delete the dn <{}>. Error: {}", dn, err.description()),
            );
            Err(err)
        }
    }
}

/// Modify an entry from a before/after pair of attribute sets
pub fn modify(
    conn: &mut Connection,
    dn: &str,
    before: &Attributes,
    after: &Attributes,
    logger: &Logger,
    ctx: &LogContext,
) -> DirectoryResult<()> {
    let changes = modify_list(before, after);
    if changes.is_empty() {
        return Ok(());
    }
    conn.session()?.modify(dn, &changes).map_err(|err| {
        let err = err.into_protocol();
        trace(
            logger,
            ctx,
            &format!("Can't modify the dn <{}>. Error: {}", dn, err.description()),
        );
        err
    })
}

/// Unbind; a failure is logged and swallowed
pub fn disconnect(mut conn: Connection, logger: &Logger, ctx: &LogContext) {
    match conn.close() {
        Ok(()) => logger.action(ctx, "disconnect").success(),
        Err(err) => logger.action(ctx, "disconnect").cause(&err).fail_soft(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::memory::{MemoryDirectory, OpKind};
    use crate::directory::modlist::attributes;
    use crate::observability::MemorySink;

    const DN: &str = "uid=repltest,dc=example,dc=com";

    fn open(dir: &MemoryDirectory, host: &str) -> Connection {
        connect(
            dir,
            &format!("ldap://{}:389", host),
            "cn=Directory Manager",
            "secret",
            Duration::from_secs(1),
            &Logger::discard(),
            &LogContext::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_connect_unreachable_is_connect_error() {
        let dir = MemoryDirectory::new();
        let err = connect(
            &dir,
            "ldap://nowhere:389",
            "",
            "",
            Duration::from_secs(1),
            &Logger::discard(),
            &LogContext::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DirectoryError::Connect { .. }));
    }

    #[test]
    fn test_search_missing_is_zero() {
        let dir = MemoryDirectory::new();
        dir.add_host("ldap1");
        let mut conn = open(&dir, "ldap1");

        let count = search(
            &mut conn,
            DN,
            SearchScope::Base,
            ANY_OBJECT_FILTER,
            &Logger::discard(),
            &LogContext::new(),
        )
        .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_add_twice_is_already_exists() {
        let dir = MemoryDirectory::new();
        dir.add_host("ldap1");
        let mut conn = open(&dir, "ldap1");
        let entry = attributes([("uid", ["repltest"])]);
        let log = Logger::discard();
        let ctx = LogContext::new();

        add(&mut conn, DN, &entry, &log, &ctx).unwrap();
        let err = add(&mut conn, DN, &entry, &log, &ctx).unwrap_err();
        assert!(matches!(err, DirectoryError::AlreadyExists { .. }));

        delete(&mut conn, DN, &log, &ctx).unwrap();
        let err = delete(&mut conn, DN, &log, &ctx).unwrap_err();
        assert!(matches!(err, DirectoryError::NoSuchObject { .. }));
    }

    #[test]
    fn test_modify_failure_is_protocol_error() {
        let dir = MemoryDirectory::new();
        dir.add_host("ldap1");
        let mut conn = open(&dir, "ldap1");
        let before = attributes([("description", ["a"])]);
        let after = attributes([("description", ["b"])]);

        let err = modify(
            &mut conn,
            DN,
            &before,
            &after,
            &Logger::discard(),
            &LogContext::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DirectoryError::Protocol { code: Some(32), .. }));
    }

    #[test]
    fn test_drop_unbinds() {
        let dir = MemoryDirectory::new();
        dir.add_host("ldap1");
        {
            let _conn = open(&dir, "ldap1");
        }
        assert_eq!(dir.count_ops("ldap1", OpKind::Unbind), 1);
    }

    #[test]
    fn test_disconnect_failure_is_logged_not_raised() {
        let dir = MemoryDirectory::new();
        dir.add_host("ldap1");
        dir.fail("ldap1", OpKind::Unbind);
        let conn = open(&dir, "ldap1");

        let sink = MemorySink::new();
        let logger = Logger::new(Severity::Trace).with_sink(sink.clone());
        disconnect(conn, &logger, &LogContext::new().with("host", "ldap1"));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["action"], "disconnect");
        assert_eq!(records[0]["status"], "fail");
        // Already closed: the drop does not unbind a second time
        assert_eq!(dir.count_ops("ldap1", OpKind::Unbind), 1);
    }
}

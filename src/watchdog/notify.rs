//! Service manager notification
//!
//! Speaks the `sd_notify` datagram protocol on the socket named by
//! `NOTIFY_SOCKET`. Without that variable every call is a no-op.

use std::env;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable carrying the notification socket
pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// Sender bound to one notification socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notifier {
    /// Filesystem path, or abstract name when it starts with `@`
    socket: String,
}

impl Notifier {
    pub fn new(socket: impl Into<String>) -> Self {
        Self {
            socket: socket.into(),
        }
    }

    /// Notifier for `NOTIFY_SOCKET`, if set and not empty
    pub fn from_env() -> Option<Self> {
        match env::var(NOTIFY_SOCKET_ENV) {
            Ok(socket) if !socket.is_empty() => Some(Self::new(socket)),
            _ => None,
        }
    }

    pub fn socket(&self) -> &str {
        &self.socket
    }

    /// Send one newline separated state block
    #[cfg(unix)]
    pub fn send(&self, state: &str) -> io::Result<()> {
        use std::os::unix::net::UnixDatagram;

        let sock = UnixDatagram::unbound()?;
        match self.socket.strip_prefix('@') {
            Some(name) => send_abstract(&sock, name, state),
            None => sock.send_to(state.as_bytes(), PathBuf::from(&self.socket)).map(|_| ()),
        }
    }

    #[cfg(not(unix))]
    pub fn send(&self, _state: &str) -> io::Result<()> {
        Ok(())
    }

    /// `EXTEND_TIMEOUT_USEC=<usec>`
    pub fn extend_timeout(&self, timeout: Duration) -> io::Result<()> {
        self.send(&format!("EXTEND_TIMEOUT_USEC={}", timeout.as_micros()))
    }

    /// `READY=1` followed by `STATUS=<status>`
    pub fn ready(&self, status: &str) -> io::Result<()> {
        self.send(&format!("READY=1\nSTATUS={}", single_line(status)))
    }

    /// `STATUS=<status>`
    pub fn status(&self, status: &str) -> io::Result<()> {
        self.send(&format!("STATUS={}", single_line(status)))
    }
}

#[cfg(target_os = "linux")]
fn send_abstract(
    sock: &std::os::unix::net::UnixDatagram,
    name: &str,
    state: &str,
) -> io::Result<()> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
    sock.send_to_addr(state.as_bytes(), &addr).map(|_| ())
}

#[cfg(all(unix, not(target_os = "linux")))]
fn send_abstract(
    _sock: &std::os::unix::net::UnixDatagram,
    _name: &str,
    _state: &str,
) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "abstract notification sockets need Linux",
    ))
}

fn single_line(status: &str) -> String {
    status.replace('\n', " ")
}

/// Ask for more start-up time; returns false when not supervised
pub fn extend_timeout(timeout: Duration) -> io::Result<bool> {
    match Notifier::from_env() {
        Some(notifier) => notifier.extend_timeout(timeout).map(|_| true),
        None => Ok(false),
    }
}

/// Report readiness with a status line; returns false when not supervised
pub fn notify_ready(status: &str) -> io::Result<bool> {
    match Notifier::from_env() {
        Some(notifier) => notifier.ready(status).map(|_| true),
        None => Ok(false),
    }
}

/// Update the status line; returns false when not supervised
pub fn notify_status(status: &str) -> io::Result<bool> {
    match Notifier::from_env() {
        Some(notifier) => notifier.status(status).map(|_| true),
        None => Ok(false),
    }
}

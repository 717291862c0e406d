//! Log sinks
//!
//! A sink receives fully formatted JSON lines. Sinks never fail the caller;
//! the logger discards their errors.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[cfg(unix)]
use std::os::unix::net::UnixDatagram;

use super::logger::Severity;

/// Destination for formatted log lines
pub trait LogSink: Send {
    /// Write one newline-terminated line
    fn write_line(&mut self, severity: Severity, line: &str) -> io::Result<()>;
}

/// Writes every line to stdout
#[derive(Debug, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_line(&mut self, _severity: Severity, line: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(line.as_bytes())?;
        stdout.flush()
    }
}

/// Appends lines to a log file
#[derive(Debug)]
pub struct FileSink {
    file: File,
}

impl FileSink {
    /// Open (or create) the log file in append mode
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl LogSink for FileSink {
    fn write_line(&mut self, _severity: Severity, line: &str) -> io::Result<()> {
        self.file.write_all(line.as_bytes())?;
        self.file.flush()
    }
}

/// Syslog facilities accepted in the configuration
pub fn facility_code(name: &str) -> Option<u8> {
    let code = match name.to_ascii_lowercase().as_str() {
        "kern" => 0,
        "user" => 1,
        "mail" => 2,
        "daemon" => 3,
        "auth" => 4,
        "syslog" => 5,
        "lpr" => 6,
        "news" => 7,
        "uucp" => 8,
        "cron" => 9,
        "authpriv" => 10,
        "ftp" => 11,
        "local0" => 16,
        "local1" => 17,
        "local2" => 18,
        "local3" => 19,
        "local4" => 20,
        "local5" => 21,
        "local6" => 22,
        "local7" => 23,
        _ => return None,
    };
    Some(code)
}

/// Sends lines to the local syslog daemon over its datagram socket
#[cfg(unix)]
#[derive(Debug)]
pub struct SyslogSink {
    socket: UnixDatagram,
    facility: u8,
    tag: String,
}

#[cfg(unix)]
impl SyslogSink {
    /// Connect to the syslog socket (usually `/dev/log`)
    pub fn connect(path: &Path, facility: u8, tag: impl Into<String>) -> io::Result<Self> {
        let socket = UnixDatagram::unbound()?;
        socket.connect(path)?;
        Ok(Self {
            socket,
            facility,
            tag: tag.into(),
        })
    }

    fn frame(&self, severity: Severity, line: &str) -> String {
        let pri = u16::from(self.facility) * 8 + u16::from(severity.syslog_code());
        format!(
            "<{}>{}[{}]: {}",
            pri,
            self.tag,
            std::process::id(),
            line.trim_end()
        )
    }
}

#[cfg(unix)]
impl LogSink for SyslogSink {
    fn write_line(&mut self, severity: Severity, line: &str) -> io::Result<()> {
        let frame = self.frame(severity, line);
        self.socket.send(frame.as_bytes()).map(|_| ())
    }
}

/// Keeps lines in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every captured line, without trailing newlines
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Captured lines parsed back into JSON values
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write_line(&mut self, _severity: Severity, line: &str) -> io::Result<()> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory sink poisoned"))?;
        lines.push(line.trim_end().to_string());
        Ok(())
    }
}

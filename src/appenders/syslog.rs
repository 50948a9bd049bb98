//! Syslog sink over a local Unix datagram socket
//!
//! Messages use the BSD syslog layout:
//!
//! ```text
//! <PRI>MMM dd HH:MM:SS HOSTNAME TAG[PID]: message
//! ```
//!
//! where `PRI = facility * 8 + severity`. The socket is connected lazily and a
//! failed send triggers one reconnect attempt before the error is returned.

use crate::core::{LoggerError, Result, Sink};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;
use std::str::FromStr;

/// Syslog facility codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facility {
    Kern = 0,
    User = 1,
    Mail = 2,
    Daemon = 3,
    Auth = 4,
    Syslog = 5,
    Lpr = 6,
    News = 7,
    Uucp = 8,
    Cron = 9,
    Authpriv = 10,
    Ftp = 11,
    Local0 = 16,
    Local1 = 17,
    Local2 = 18,
    Local3 = 19,
    Local4 = 20,
    Local5 = 21,
    Local6 = 22,
    Local7 = 23,
}

impl Facility {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl FromStr for Facility {
    type Err = LoggerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let facility = match s.to_ascii_lowercase().as_str() {
            "kern" => Facility::Kern,
            "user" => Facility::User,
            "mail" => Facility::Mail,
            "daemon" => Facility::Daemon,
            "auth" => Facility::Auth,
            "syslog" => Facility::Syslog,
            "lpr" => Facility::Lpr,
            "news" => Facility::News,
            "uucp" => Facility::Uucp,
            "cron" => Facility::Cron,
            "authpriv" => Facility::Authpriv,
            "ftp" => Facility::Ftp,
            "local0" => Facility::Local0,
            "local1" => Facility::Local1,
            "local2" => Facility::Local2,
            "local3" => Facility::Local3,
            "local4" => Facility::Local4,
            "local5" => Facility::Local5,
            "local6" => Facility::Local6,
            "local7" => Facility::Local7,
            other => {
                return Err(LoggerError::config(
                    "syslog",
                    format!("unknown facility '{}'", other),
                ))
            }
        };
        Ok(facility)
    }
}

/// Syslog transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyslogOptions {
    #[serde(default = "default_tag", alias = "app_name", alias = "appName")]
    pub tag: String,
    #[serde(default = "default_facility")]
    pub facility: String,
    #[serde(default = "default_hostname", alias = "host")]
    pub hostname: String,
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Threshold level name for this sink
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_tag() -> String {
    "Logger".to_string()
}

fn default_facility() -> String {
    "local0".to_string()
}

fn default_path() -> PathBuf {
    PathBuf::from("/dev/log")
}

fn default_level() -> String {
    "debug".to_string()
}

/// Host name from `HOSTNAME`, then `/etc/hostname`, then `localhost`
pub fn default_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

impl Default for SyslogOptions {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            facility: default_facility(),
            hostname: default_hostname(),
            path: default_path(),
            level: default_level(),
        }
    }
}

pub struct SyslogSink {
    options: SyslogOptions,
    facility: Facility,
    severity_map: fn(u8) -> u8,
    socket: Option<UnixDatagram>,
    pid: u32,
}

impl SyslogSink {
    /// Create a sink; the socket is opened on the first write
    pub fn new(options: SyslogOptions) -> Result<Self> {
        let facility = options.facility.parse()?;
        Ok(Self {
            options,
            facility,
            severity_map: |rank| rank.min(7),
            socket: None,
            pid: std::process::id(),
        })
    }

    /// Translate record ranks to syslog severities (identity by default)
    #[must_use]
    pub fn with_severity_map(mut self, map: fn(u8) -> u8) -> Self {
        self.severity_map = map;
        self
    }

    pub fn options(&self) -> &SyslogOptions {
        &self.options
    }

    /// Serialize one line into a syslog datagram
    pub fn format_message(&self, line: &str, rank: u8) -> String {
        let severity = (self.severity_map)(rank).min(7);
        let priority = u16::from(self.facility.code()) * 8 + u16::from(severity);
        format!(
            "<{}>{} {} {}[{}]: {}",
            priority,
            Local::now().format("%b %e %H:%M:%S"),
            self.options.hostname,
            self.options.tag,
            self.pid,
            line.trim_end_matches('\n')
        )
    }

    fn connect(&mut self) -> Result<&UnixDatagram> {
        if self.socket.is_none() {
            let socket = UnixDatagram::unbound()?;
            socket.connect(&self.options.path)?;
            self.socket = Some(socket);
        }
        self.socket
            .as_ref()
            .ok_or_else(|| LoggerError::sink_write("syslog", "socket not connected"))
    }

    fn send(&mut self, message: &str) -> Result<()> {
        let socket = self.connect()?;
        socket.send(message.as_bytes())?;
        Ok(())
    }
}

impl Sink for SyslogSink {
    fn write(&mut self, line: &str, severity: u8) -> Result<()> {
        let message = self.format_message(line, severity);

        match self.send(&message) {
            Ok(()) => Ok(()),
            Err(first) => {
                self.socket = None;
                self.send(&message).map_err(|retry| {
                    LoggerError::sink_write(
                        "syslog",
                        format!(
                            "send to {} failed: {} (reconnect: {})",
                            self.options.path.display(),
                            first,
                            retry
                        ),
                    )
                })
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "syslog"
    }
}

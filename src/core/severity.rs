//! Severity models
//!
//! A severity model is an ordered vocabulary of level names. Lower rank means
//! more severe. Two models ship with the crate:
//!
//! - [`Syslog`]: the eight syslog levels, `emerg` (0) to `debug` (7)
//! - [`Npm`]: the six npm-style levels, `error` (0) to `silly` (5)
//!
//! The model is chosen as a type parameter of the logger, so one logger never
//! mixes the two vocabularies.

use super::error::{LoggerError, Result};
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::fmt;

/// A named point on a severity scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Severity {
    name: &'static str,
    rank: u8,
}

impl Severity {
    pub const fn new(name: &'static str, rank: u8) -> Self {
        Self { name, rank }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn rank(&self) -> u8 {
        self.rank
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An ordered level vocabulary with aliases and a color scheme
pub trait SeverityModel: Send + Sync + 'static {
    /// Model name used in diagnostics
    const NAME: &'static str;

    /// Canonical levels, most severe first
    const LEVELS: &'static [Severity];

    /// `(alias, canonical name)` pairs
    const ALIASES: &'static [(&'static str, &'static str)];

    /// Level used to render records whose level name is unknown
    const FALLBACK: Severity;

    /// Paint `text` in the color assigned to `severity`
    fn paint(severity: Severity, text: &str) -> ColoredString;

    /// Resolve a level name or alias, case-insensitively
    fn lookup(name: &str) -> Option<Severity> {
        let lower = name.trim().to_ascii_lowercase();
        let canonical = Self::ALIASES
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map(|(_, canonical)| *canonical)
            .unwrap_or(lower.as_str());

        Self::LEVELS
            .iter()
            .copied()
            .find(|level| level.name == canonical)
    }

    /// Numeric rank of a level name
    fn rank_of(name: &str) -> Result<u8> {
        Self::lookup(name)
            .map(|level| level.rank)
            .ok_or_else(|| LoggerError::unknown_level(name, Self::NAME))
    }

    /// Severity for rendering a record; unknown names take the fallback level
    fn severity(name: &str) -> Severity {
        Self::lookup(name).unwrap_or(Self::FALLBACK)
    }

    /// Rank that admits every level of the model
    fn least_restrictive_rank() -> u8 {
        Self::LEVELS
            .iter()
            .map(|level| level.rank)
            .max()
            .unwrap_or(u8::MAX)
    }

    /// Threshold rank for a sink; unknown names admit everything
    fn threshold_rank(name: &str) -> u8 {
        Self::rank_of(name).unwrap_or_else(|_| Self::least_restrictive_rank())
    }

    #[inline]
    fn is_admitted(record_rank: u8, threshold_rank: u8) -> bool {
        record_rank <= threshold_rank
    }

    /// Default colorized rendering of a level name
    fn colorize(severity: Severity) -> String {
        Self::paint(severity, severity.name).to_string()
    }

    /// Syslog severity code (0-7) for a rank of this model
    fn syslog_code(rank: u8) -> u8 {
        rank.min(7)
    }
}

/// Eight-level syslog model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Syslog;

impl Syslog {
    pub const EMERG: Severity = Severity::new("emerg", 0);
    pub const ALERT: Severity = Severity::new("alert", 1);
    pub const CRIT: Severity = Severity::new("crit", 2);
    pub const ERROR: Severity = Severity::new("error", 3);
    pub const WARN: Severity = Severity::new("warn", 4);
    pub const NOTICE: Severity = Severity::new("notice", 5);
    pub const INFO: Severity = Severity::new("info", 6);
    pub const DEBUG: Severity = Severity::new("debug", 7);
}

impl SeverityModel for Syslog {
    const NAME: &'static str = "syslog";

    const LEVELS: &'static [Severity] = &[
        Syslog::EMERG,
        Syslog::ALERT,
        Syslog::CRIT,
        Syslog::ERROR,
        Syslog::WARN,
        Syslog::NOTICE,
        Syslog::INFO,
        Syslog::DEBUG,
    ];

    const ALIASES: &'static [(&'static str, &'static str)] = &[
        ("emergency", "emerg"),
        ("critical", "crit"),
        ("err", "error"),
        ("warning", "warn"),
        ("log", "info"),
        ("trace", "debug"),
    ];

    const FALLBACK: Severity = Syslog::DEBUG;

    fn paint(severity: Severity, text: &str) -> ColoredString {
        match severity.rank {
            0 => text.red().bold(),
            1 => text.cyan(),
            2 => text.red().underline(),
            3 => text.red(),
            4 => text.yellow(),
            5 => text.magenta(),
            6 => text.green(),
            _ => text.blue(),
        }
    }
}

/// Six-level npm-style model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Npm;

impl Npm {
    pub const ERROR: Severity = Severity::new("error", 0);
    pub const WARN: Severity = Severity::new("warn", 1);
    pub const INFO: Severity = Severity::new("info", 2);
    pub const VERBOSE: Severity = Severity::new("verbose", 3);
    pub const DEBUG: Severity = Severity::new("debug", 4);
    pub const SILLY: Severity = Severity::new("silly", 5);
}

impl SeverityModel for Npm {
    const NAME: &'static str = "npm";

    const LEVELS: &'static [Severity] = &[
        Npm::ERROR,
        Npm::WARN,
        Npm::INFO,
        Npm::VERBOSE,
        Npm::DEBUG,
        Npm::SILLY,
    ];

    const ALIASES: &'static [(&'static str, &'static str)] =
        &[("err", "error"), ("warning", "warn")];

    const FALLBACK: Severity = Npm::DEBUG;

    fn syslog_code(rank: u8) -> u8 {
        match rank {
            0 => 3,
            1 => 4,
            2 => 6,
            _ => 7,
        }
    }

    fn paint(severity: Severity, text: &str) -> ColoredString {
        match severity.rank {
            0 => text.red(),
            1 => text.yellow(),
            2 => text.green(),
            3 => text.cyan(),
            4 => text.blue(),
            _ => text.magenta(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syslog_ranks() {
        assert_eq!(Syslog::rank_of("emerg").unwrap(), 0);
        assert_eq!(Syslog::rank_of("error").unwrap(), 3);
        assert_eq!(Syslog::rank_of("debug").unwrap(), 7);
    }

    #[test]
    fn test_syslog_aliases() {
        assert_eq!(Syslog::lookup("err"), Some(Syslog::ERROR));
        assert_eq!(Syslog::lookup("warning"), Some(Syslog::WARN));
        assert_eq!(Syslog::lookup("log"), Some(Syslog::INFO));
        assert_eq!(Syslog::lookup("trace"), Some(Syslog::DEBUG));
        assert_eq!(Syslog::lookup("CRITICAL"), Some(Syslog::CRIT));
    }

    #[test]
    fn test_npm_vocabulary_is_separate() {
        assert_eq!(Npm::rank_of("silly").unwrap(), 5);
        assert_eq!(Npm::rank_of("verbose").unwrap(), 3);
        assert!(Npm::rank_of("emerg").is_err());
        assert!(Npm::rank_of("trace").is_err());
        assert!(Syslog::rank_of("silly").is_err());
    }

    #[test]
    fn test_unknown_threshold_admits_everything() {
        assert_eq!(Syslog::threshold_rank("chatty"), 7);
        assert_eq!(Npm::threshold_rank("chatty"), 5);
        assert!(Syslog::is_admitted(7, Syslog::threshold_rank("chatty")));
    }

    #[test]
    fn test_unknown_record_level_uses_fallback() {
        assert_eq!(Syslog::severity("chatty"), Syslog::DEBUG);
        assert_eq!(Npm::severity("chatty"), Npm::DEBUG);
    }

    #[test]
    fn test_is_admitted() {
        let info = Syslog::rank_of("info").unwrap();
        assert!(Syslog::is_admitted(Syslog::ERROR.rank(), info));
        assert!(Syslog::is_admitted(info, info));
        assert!(!Syslog::is_admitted(Syslog::DEBUG.rank(), info));
    }

    #[test]
    fn test_syslog_codes() {
        assert_eq!(Syslog::syslog_code(Syslog::WARN.rank()), 4);
        assert_eq!(Npm::syslog_code(Npm::ERROR.rank()), 3);
        assert_eq!(Npm::syslog_code(Npm::INFO.rank()), 6);
        assert_eq!(Npm::syslog_code(Npm::SILLY.rank()), 7);
    }

    #[test]
    fn test_unknown_rank_error() {
        let err = Syslog::rank_of("loud").unwrap_err();
        assert!(matches!(err, LoggerError::UnknownLevel { model: "syslog", .. }));
    }
}

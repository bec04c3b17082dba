//! Log severity levels.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Log severity, most severe first.
///
/// The discriminant order doubles as the threshold ordinal: a record is
/// emitted when its level compares less than or equal to the logger's
/// configured level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Unrecoverable failure; logging at this level terminates the process.
    Crit,
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Returned when a level name does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level {0:?}")]
pub struct ParseLevelError(pub String);

impl Level {
    /// Lowercase name, as it appears in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Crit => "crit",
            Level::Fatal => "fatal",
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        }
    }

    /// Fixed-width uppercase tag for text formatters.
    pub(crate) fn tag(&self) -> &'static str {
        match self {
            Level::Crit => "CRIT ",
            Level::Fatal => "FATAL",
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    /// ANSI color prefix for the terminal formatter.
    pub(crate) fn color(&self) -> &'static str {
        match self {
            Level::Crit => "\x1b[35m",
            Level::Fatal => "\x1b[31;1m",
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[34m",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crit" => Ok(Level::Crit),
            "fatal" => Ok(Level::Fatal),
            "error" => Ok(Level::Error),
            "warn" => Ok(Level::Warn),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            "trace" => Ok(Level::Trace),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

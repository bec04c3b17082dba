//! Leveled, context-aware logger front end.

use std::borrow::Cow;
use std::fmt;
use std::panic::Location;
use std::process;
use std::sync::Arc;

use chrono::Local;
use serde_json::Value;

use super::level::Level;
use super::sink::{Record, Sink};

/// A typed key/value context pair.
///
/// Pairing is structural, so a dangling key without a value cannot exist.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: Cow<'static, str>,
    pub value: Value,
}

impl Field {
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Build an ordered list of context [`Field`]s.
///
/// ```
/// use nodekit::fields;
///
/// let ctx = fields! { "peer" => "enode://..", "inbound" => true };
/// assert_eq!(ctx.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => { Vec::<$crate::logging::Field>::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {
        vec![$($crate::logging::Field::new($key, $value)),+]
    };
}

/// A leveled logger carrying an ordered inherited context.
///
/// Cloning is cheap; all clones and children share one [`Sink`]. A child
/// appends its own pairs after the parent's, preserving order and keeping
/// duplicate keys.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<Sink>,
    level: Level,
    ctx: Vec<Field>,
}

impl Logger {
    /// Root logger over `sink`, emitting records at or above `level`.
    pub fn new(sink: Arc<Sink>, level: Level) -> Self {
        Self {
            sink,
            level,
            ctx: Vec::new(),
        }
    }

    /// Derive a child logger with `ctx` appended after this logger's own
    /// context pairs.
    pub fn child(&self, ctx: Vec<Field>) -> Logger {
        let mut merged = self.ctx.clone();
        merged.extend(ctx);
        Logger {
            sink: Arc::clone(&self.sink),
            level: self.level,
            ctx: merged,
        }
    }

    /// The minimum severity this logger emits.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The underlying write path: filter by level, stamp time and call
    /// site, dispatch to the sink. Never returns an error to the caller.
    ///
    /// The whole entry-point chain down to here is `#[track_caller]`, so
    /// the record names the application call site rather than a wrapper
    /// frame.
    #[track_caller]
    pub fn log(&self, level: Level, msg: &str, ctx: &[Field]) {
        if level > self.level {
            return;
        }
        self.sink.write(&Record {
            time: Local::now(),
            level,
            msg,
            ctx: &self.ctx,
            extra: ctx,
            caller: Location::caller(),
        });
    }

    #[track_caller]
    pub fn trace(&self, msg: &str, ctx: &[Field]) {
        self.log(Level::Trace, msg, ctx);
    }

    #[track_caller]
    pub fn debug(&self, msg: &str, ctx: &[Field]) {
        self.log(Level::Debug, msg, ctx);
    }

    #[track_caller]
    pub fn info(&self, msg: &str, ctx: &[Field]) {
        self.log(Level::Info, msg, ctx);
    }

    #[track_caller]
    pub fn warn(&self, msg: &str, ctx: &[Field]) {
        self.log(Level::Warn, msg, ctx);
    }

    #[track_caller]
    pub fn error(&self, msg: &str, ctx: &[Field]) {
        self.log(Level::Error, msg, ctx);
    }

    #[track_caller]
    pub fn fatal(&self, msg: &str, ctx: &[Field]) {
        self.log(Level::Fatal, msg, ctx);
    }

    /// Log at crit and terminate the process with exit code 1. The sink is
    /// flushed first so the record reaches disk.
    #[track_caller]
    pub fn crit(&self, msg: &str, ctx: &[Field]) -> ! {
        self.log(Level::Crit, msg, ctx);
        self.sink.flush();
        process::exit(1);
    }

    #[track_caller]
    pub fn tracef(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Trace, &args.to_string(), &[]);
    }

    #[track_caller]
    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, &args.to_string(), &[]);
    }

    #[track_caller]
    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, &args.to_string(), &[]);
    }

    #[track_caller]
    pub fn warnf(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, &args.to_string(), &[]);
    }

    #[track_caller]
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, &args.to_string(), &[]);
    }

    #[track_caller]
    pub fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Fatal, &args.to_string(), &[]);
    }

    /// Formatted sibling of [`crit`](Self::crit); interpolation happens at
    /// the call site and no structured context is attached.
    #[track_caller]
    pub fn critf(&self, args: fmt::Arguments<'_>) -> ! {
        self.log(Level::Crit, &args.to_string(), &[]);
        self.sink.flush();
        process::exit(1);
    }

    pub(crate) fn flush(&self) {
        self.sink.flush();
    }
}

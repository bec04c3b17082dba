//! Record formatting and sink fan-out.
//!
//! A [`Sink`] is the writer/formatter fan-out a logger dispatches into:
//! each output pairs a format with a boxed writer, and writes are
//! serialized behind a mutex so concurrent loggers never interleave lines.

use std::io::{self, IsTerminal, Write};
use std::panic::Location;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local, SecondsFormat};
use serde_json::Value;

use super::level::Level;
use super::logger::Field;

const ANSI_RESET: &str = "\x1b[0m";

/// Column the first context pair starts at in the terminal format.
const TERM_MSG_PAD: usize = 40;

/// A single log record on its way to the sink.
pub struct Record<'a> {
    pub time: DateTime<Local>,
    pub level: Level,
    pub msg: &'a str,
    /// Context inherited from the logger, in derivation order.
    pub ctx: &'a [Field],
    /// Context supplied at the call site, rendered after `ctx`.
    pub extra: &'a [Field],
    /// Application call site, captured through the `#[track_caller]` chain.
    pub caller: &'static Location<'static>,
}

impl Record<'_> {
    fn fields(&self) -> impl Iterator<Item = &Field> {
        self.ctx.iter().chain(self.extra.iter())
    }
}

/// How a sink output renders records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFormat {
    /// Colorized, timestamped text for terminals.
    Terminal,
    /// Plain `key=value` text.
    Plain,
    /// One JSON object per line.
    Json,
}

pub(crate) struct Output {
    format: SinkFormat,
    writer: Box<dyn Write + Send>,
}

impl Output {
    pub(crate) fn new(format: SinkFormat, writer: Box<dyn Write + Send>) -> Self {
        Self { format, writer }
    }
}

/// The writer/formatter fan-out shared by a logger and all its children.
pub struct Sink {
    outputs: Mutex<Vec<Output>>,
}

impl Sink {
    pub(crate) fn new(outputs: Vec<Output>) -> Self {
        Self {
            outputs: Mutex::new(outputs),
        }
    }

    /// Text sink on standard output, colorized when stdout is a terminal.
    pub fn console() -> Self {
        let format = if io::stdout().is_terminal() {
            SinkFormat::Terminal
        } else {
            SinkFormat::Plain
        };
        Sink::new(vec![Output::new(format, Box::new(io::stdout()))])
    }

    /// Format and write `record` to every output. Write errors are
    /// swallowed; a failing sink must not abort the caller.
    pub(crate) fn write(&self, record: &Record<'_>) {
        let mut outputs = lock(&self.outputs);
        for output in outputs.iter_mut() {
            let mut line = Vec::with_capacity(256);
            match output.format {
                SinkFormat::Terminal => format_terminal(&mut line, record),
                SinkFormat::Plain => format_plain(&mut line, record),
                SinkFormat::Json => format_json(&mut line, record),
            }
            let _ = output.writer.write_all(&line);
            let _ = output.writer.flush();
        }
    }

    pub(crate) fn flush(&self) {
        let mut outputs = lock(&self.outputs);
        for output in outputs.iter_mut() {
            let _ = output.writer.flush();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn format_terminal(buf: &mut Vec<u8>, record: &Record<'_>) {
    let _ = write!(
        buf,
        "{}{}{}[{}] {}",
        record.level.color(),
        record.level.tag(),
        ANSI_RESET,
        record.time.format("%m-%d|%H:%M:%S%.3f"),
        record.msg,
    );
    for _ in record.msg.len()..TERM_MSG_PAD {
        buf.push(b' ');
    }
    for field in record.fields() {
        let _ = write!(buf, " {}={}", field.key, render_value(&field.value));
    }
    let _ = writeln!(buf, " caller={}:{}", record.caller.file(), record.caller.line());
}

fn format_plain(buf: &mut Vec<u8>, record: &Record<'_>) {
    let _ = write!(
        buf,
        "t={} lvl={} msg={}",
        record.time.to_rfc3339_opts(SecondsFormat::Millis, true),
        record.level,
        render_value(&Value::from(record.msg)),
    );
    for field in record.fields() {
        let _ = write!(buf, " {}={}", field.key, render_value(&field.value));
    }
    let _ = writeln!(buf, " caller={}:{}", record.caller.file(), record.caller.line());
}

// Assembled by hand rather than through `serde_json::Map`, which would
// deduplicate repeated context keys.
fn format_json(buf: &mut Vec<u8>, record: &Record<'_>) {
    let _ = write!(
        buf,
        "{{\"t\":{},\"lvl\":{},\"msg\":{}",
        json_str(&record.time.to_rfc3339_opts(SecondsFormat::Millis, true)),
        json_str(record.level.as_str()),
        json_str(record.msg),
    );
    for field in record.fields() {
        let _ = write!(buf, ",{}:{}", json_str(&field.key), field.value);
    }
    let _ = writeln!(
        buf,
        ",\"caller\":{}}}",
        json_str(&format!("{}:{}", record.caller.file(), record.caller.line())),
    );
}

fn json_str(s: &str) -> String {
    Value::from(s).to_string()
}

/// logfmt-style value rendering: bare where unambiguous, JSON-quoted
/// otherwise.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) if !needs_quotes(s) => s.clone(),
        other => other.to_string(),
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty() || s.contains([' ', '"', '='])
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Arc;

    /// Writer that appends into a shared buffer, for asserting on output.
    #[derive(Clone)]
    pub(crate) struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn capture_sink(format: SinkFormat) -> (Arc<Sink>, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let output = Output::new(format, Box::new(SharedBuf(Arc::clone(&buf))));
        (Arc::new(Sink::new(vec![output])), buf)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::capture_sink;
    use super::*;
    use crate::fields;
    use std::sync::Arc;

    fn record<'a>(ctx: &'a [Field], extra: &'a [Field]) -> Record<'a> {
        Record {
            time: Local::now(),
            level: Level::Info,
            msg: "unit under test",
            ctx,
            extra,
            caller: Location::caller(),
        }
    }

    fn written(buf: &Mutex<Vec<u8>>) -> String {
        String::from_utf8(buf.lock().unwrap().clone()).unwrap()
    }

    #[test]
    fn test_plain_renders_fields_in_order() {
        let (sink, buf) = capture_sink(SinkFormat::Plain);
        let ctx = fields! { "chain" => "mainnet" };
        let extra = fields! { "peer" => 7, "chain" => "devnet" };
        sink.write(&record(&ctx, &extra));

        let line = written(&buf);
        assert!(line.starts_with("t="));
        assert!(line.contains("lvl=info"));
        assert!(line.contains("msg=\"unit under test\""));
        // Inherited context first, call-site pairs after, duplicates kept.
        let chain = line.find("chain=mainnet").unwrap();
        let peer = line.find("peer=7").unwrap();
        let dup = line.find("chain=devnet").unwrap();
        assert!(chain < peer && peer < dup);
        assert!(line.contains("caller=src/logging/sink.rs:"));
    }

    #[test]
    fn test_json_preserves_order_and_duplicates() {
        let (sink, buf) = capture_sink(SinkFormat::Json);
        let ctx = fields! { "a" => 1 };
        let extra = fields! { "a" => 2 };
        sink.write(&record(&ctx, &extra));

        let line = written(&buf);
        assert!(line.starts_with("{\"t\":"));
        assert!(line.contains("\"lvl\":\"info\""));
        let first = line.find("\"a\":1").unwrap();
        let second = line.find("\"a\":2").unwrap();
        assert!(first < second);
        assert!(line.trim_end().ends_with('}'));
    }

    #[test]
    fn test_terminal_colorizes_level() {
        let (sink, buf) = capture_sink(SinkFormat::Terminal);
        sink.write(&record(&[], &[]));

        let line = written(&buf);
        assert!(line.contains("\x1b[32mINFO \x1b[0m"));
        assert!(line.contains("unit under test"));
    }

    #[test]
    fn test_value_quoting() {
        assert_eq!(render_value(&Value::from("bare")), "bare");
        assert_eq!(render_value(&Value::from("two words")), "\"two words\"");
        assert_eq!(render_value(&Value::from("")), "\"\"");
        assert_eq!(render_value(&Value::from(42)), "42");
        assert_eq!(render_value(&Value::from(true)), "true");
    }

    #[test]
    fn test_fan_out_writes_every_output() {
        let buf_a = Arc::new(Mutex::new(Vec::new()));
        let buf_b = Arc::new(Mutex::new(Vec::new()));
        let sink = Sink::new(vec![
            Output::new(SinkFormat::Plain, Box::new(testing::SharedBuf(Arc::clone(&buf_a)))),
            Output::new(SinkFormat::Json, Box::new(testing::SharedBuf(Arc::clone(&buf_b)))),
        ]);
        sink.write(&record(&[], &[]));

        assert!(written(&buf_a).contains("msg=\"unit under test\""));
        assert!(written(&buf_b).contains("\"msg\":\"unit under test\""));
    }
}

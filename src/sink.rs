//! Structured log records and the sinks that receive them.
//!
//! Middleware never talks to a global logger. Each stage is constructed with
//! an `Arc<dyn Sink>` and hands it finished [`Record`]s. Two sinks ship with
//! the crate:
//!
//! - [`TracingSink`] forwards records to `tracing` events under the
//!   `trailmark::access` target.
//! - [`MemorySink`] keeps them in memory, for tests and for callers who want
//!   to inspect the pipeline's output.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::level_filters::LevelFilter;

/// Well-known field names shared by every stage.
pub mod fields {
    pub const XID: &str = "xid";
    pub const METHOD: &str = "method";
    pub const PATH_URI: &str = "path_uri";
    pub const HEADER: &str = "header";
    pub const BODY: &str = "body";
    pub const STATUS: &str = "status";
    pub const LATENCY: &str = "latency";
}

// ── Level ─────────────────────────────────────────────────────────────────────

/// Verbosity threshold of a sink, and the severity of a record.
///
/// `Debug` is the detailed level: request headers and bodies, response bodies.
/// `Info` is the summary level.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Level {
    Debug,
    Info,
}

impl Level {
    /// Environment variable read by [`Level::from_env`].
    pub const ENV: &'static str = "TRAILMARK_LOG_LEVEL";

    pub fn is_detailed(self) -> bool {
        self == Self::Debug
    }

    /// Reads [`Level::ENV`]; unset or unparsable values fall back to `Info`.
    pub fn from_env() -> Self {
        std::env::var(Self::ENV)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::Info)
    }
}

/// Coarser thresholds than `info` collapse to `Info`: summary records are
/// always emitted, so there is nothing quieter to select.
impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" | "debug"         => Ok(Self::Debug),
            "info" | "warn" | "error" => Ok(Self::Info),
            _                         => Err(ParseLevelError(s.to_owned())),
        }
    }
}

impl From<LevelFilter> for Level {
    fn from(filter: LevelFilter) -> Self {
        if filter >= LevelFilter::DEBUG { Self::Debug } else { Self::Info }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info  => "info",
        })
    }
}

/// Returned when a string names no known level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level `{}`", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

// ── Record ────────────────────────────────────────────────────────────────────

/// A typed field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Duration(Duration),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(d) => Some(*d),
            _ => None,
        }
    }
}

/// Durations render like `1.234ms`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s)      => f.write_str(s),
            Self::Int(n)      => write!(f, "{n}"),
            Self::Duration(d) => write!(f, "{d:?}"),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Self::Str(s) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Self::Str(s.to_owned()) }
}

impl From<Cow<'_, str>> for Value {
    fn from(s: Cow<'_, str>) -> Self { Self::Str(s.into_owned()) }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self { Self::Int(n) }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self { Self::Int(i64::from(n)) }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self { Self::Duration(d) }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub value: Value,
}

/// One log line: a level, a message, and fields in insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    level: Level,
    message: String,
    fields: Vec<Field>,
}

impl Record {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self { level, message: message.into(), fields: Vec::new() }
    }

    /// Appends a field. Returns `self` for chaining.
    pub fn with(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push(Field { name, value: value.into() });
        self
    }

    pub fn level(&self) -> Level { self.level }
    pub fn message(&self) -> &str { &self.message }
    pub fn fields(&self) -> &[Field] { &self.fields }

    /// First field called `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }
}

// ── Sink ──────────────────────────────────────────────────────────────────────

/// Destination for records.
///
/// `level` is the configured threshold. Stages consult it before building
/// expensive fields; a sink may still drop records below its threshold.
/// Implementations are shared across concurrent requests.
pub trait Sink: Send + Sync + 'static {
    fn level(&self) -> Level;
    fn emit(&self, record: Record);
}

/// Forwards records to `tracing`.
///
/// Each well-known field from [`fields`] becomes a structured event field;
/// fields a record lacks are left out of the event.
#[derive(Clone, Copy, Debug)]
pub struct TracingSink {
    level: Level,
}

impl TracingSink {
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Takes the threshold from the installed subscriber's max level.
    pub fn from_current() -> Self {
        Self::new(LevelFilter::current().into())
    }
}

impl Sink for TracingSink {
    fn level(&self) -> Level {
        self.level
    }

    fn emit(&self, record: Record) {
        if record.level < self.level {
            return;
        }

        let text = |name: &str| record.get(name).map(Value::to_string);
        let xid = text(fields::XID);
        let method = text(fields::METHOD);
        let path_uri = text(fields::PATH_URI);
        let header = text(fields::HEADER);
        let body = text(fields::BODY);
        let latency = text(fields::LATENCY);
        let status = record.get(fields::STATUS).and_then(Value::as_int);

        let (xid, method, path_uri, header, body, latency) = (
            xid.as_deref(),
            method.as_deref(),
            path_uri.as_deref(),
            header.as_deref(),
            body.as_deref(),
            latency.as_deref(),
        );

        match record.level {
            Level::Debug => tracing::debug!(
                target: "trailmark::access",
                xid, method, path_uri, header, body, status, latency,
                "{}", record.message
            ),
            Level::Info => tracing::info!(
                target: "trailmark::access",
                xid, method, path_uri, header, body, status, latency,
                "{}", record.message
            ),
        }
    }
}

/// Keeps every emitted record in memory.
#[derive(Debug)]
pub struct MemorySink {
    level: Level,
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    pub fn new(level: Level) -> Self {
        Self { level, records: Mutex::new(Vec::new()) }
    }

    /// Snapshot of the records emitted so far, oldest first.
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Records whose message starts with `prefix`.
    pub fn matching(&self, prefix: &str) -> Vec<Record> {
        self.records()
            .into_iter()
            .filter(|r| r.message.starts_with(prefix))
            .collect()
    }
}

impl Sink for MemorySink {
    fn level(&self) -> Level {
        self.level
    }

    fn emit(&self, record: Record) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn parses_levels() {
        assert_eq!("debug".parse::<Level>(), Ok(Level::Debug));
        assert_eq!("TRACE".parse::<Level>(), Ok(Level::Debug));
        assert_eq!(" info ".parse::<Level>(), Ok(Level::Info));
        assert_eq!("error".parse::<Level>(), Ok(Level::Info));
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn level_from_filter() {
        assert_eq!(Level::from(LevelFilter::TRACE), Level::Debug);
        assert_eq!(Level::from(LevelFilter::DEBUG), Level::Debug);
        assert_eq!(Level::from(LevelFilter::INFO), Level::Info);
        assert_eq!(Level::from(LevelFilter::OFF), Level::Info);
    }

    #[test]
    fn debug_is_below_info() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Debug.is_detailed());
        assert!(!Level::Info.is_detailed());
    }

    #[test]
    fn record_keeps_field_order() {
        let record = Record::new(Level::Info, "api_summary")
            .with(fields::XID, "abc-123")
            .with(fields::STATUS, 200u16)
            .with(fields::LATENCY, Duration::from_micros(1500));

        let names: Vec<_> = record.fields().iter().map(|f| f.name).collect();
        assert_eq!(names, ["xid", "status", "latency"]);
        assert_eq!(record.get(fields::STATUS).and_then(Value::as_int), Some(200));
        assert_eq!(record.get(fields::LATENCY).map(Value::to_string).as_deref(), Some("1.5ms"));
        assert_eq!(record.get(fields::BODY), None);
    }

    #[test]
    fn memory_sink_filters_by_message_prefix() {
        let sink = MemorySink::new(Level::Debug);
        sink.emit(Record::new(Level::Debug, "request_information"));
        sink.emit(Record::new(Level::Info, "api_summary: method=GET"));

        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.matching("api_summary").len(), 1);
    }

    /// Buffer shared between a test and the `fmt` subscriber it installs.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Emits `records` through `sink` under a debug-level subscriber and
    /// returns the formatted output, one line per event.
    fn emit_through(sink: TracingSink, records: Vec<Record>) -> Vec<String> {
        let out = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(out.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            for record in records {
                sink.emit(record);
            }
        });

        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        text.lines().map(str::to_owned).collect()
    }

    fn summary() -> Record {
        Record::new(Level::Info, "api_summary: method=GET, path=/orders/:id, status=500")
            .with(fields::XID, "abc-123")
            .with(fields::METHOD, "GET")
            .with(fields::PATH_URI, "/orders/:id")
            .with(fields::STATUS, 500u16)
            .with(fields::LATENCY, Duration::from_micros(1500))
    }

    fn detail() -> Record {
        Record::new(Level::Debug, "request_information")
            .with(fields::XID, "abc-123")
            .with(fields::BODY, "{}")
    }

    #[test]
    fn tracing_sink_writes_structured_events() {
        let lines = emit_through(TracingSink::new(Level::Debug), vec![detail(), summary()]);
        assert_eq!(lines.len(), 2, "{lines:?}");

        let debug = &lines[0];
        assert!(debug.contains("DEBUG"), "{debug}");
        assert!(debug.contains("trailmark::access"), "{debug}");
        assert!(debug.contains("request_information"), "{debug}");
        assert!(debug.contains(r#"body="{}""#), "{debug}");
        assert!(!debug.contains("status="), "{debug}");

        let info = &lines[1];
        assert!(info.contains("INFO"), "{info}");
        assert!(info.contains("trailmark::access"), "{info}");
        assert!(info.contains("api_summary: method=GET, path=/orders/:id, status=500"), "{info}");
        assert!(info.contains(r#"xid="abc-123""#), "{info}");
        assert!(info.contains(r#"method="GET""#), "{info}");
        assert!(info.contains(r#"path_uri="/orders/:id" status=500 latency="1.5ms""#), "{info}");
    }

    #[test]
    fn tracing_sink_drops_records_below_its_threshold() {
        let lines = emit_through(TracingSink::new(Level::Info), vec![detail(), summary()]);
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(lines[0].contains("api_summary"));
        assert!(lines.iter().all(|line| !line.contains("request_information")));
    }
}

//! The log event model read by resolvers.
//!
//! [`LogEvent`] holds exactly the facts the event resolvers know how to
//! extract: message, level, logger, instant, thread metadata, the context
//! map (MDC) and stack (NDC), an optional marker, the source location, an
//! optional [`Throwable`], and the end-of-batch flag.
//!
//! Events are built with chained `with_*` calls:
//!
//! ```rust
//! use jsonlayout::event::{Level, LogEvent, Message};
//!
//! let event = LogEvent::new(Level::Info, Message::text("user logged in"))
//!     .with_logger("app.auth")
//!     .with_context("user", "alice")
//!     .with_context_stack(["request-42"]);
//!
//! assert_eq!(event.level.name(), "INFO");
//! assert_eq!(event.context_data["user"], "alice");
//! ```

mod throwable;

pub use throwable::{CausalLoop, StackFrame, Throwable};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

/// Event severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Level {
    pub fn name(&self) -> &'static str {
        match self {
            Level::Fatal => "FATAL",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    /// The syslog severity this level maps to.
    pub fn severity(&self) -> Severity {
        match self {
            Level::Fatal => Severity::Emergency,
            Level::Error => Severity::Error,
            Level::Warn => Severity::Warning,
            Level::Info => Severity::Info,
            Level::Debug | Level::Trace => Severity::Debug,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

/// Syslog (RFC 5424) severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Emergency => "EMERGENCY",
            Severity::Alert => "ALERT",
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Notice => "NOTICE",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Severity::Emergency => 0,
            Severity::Alert => 1,
            Severity::Critical => 2,
            Severity::Error => 3,
            Severity::Warning => 4,
            Severity::Notice => 5,
            Severity::Info => 6,
            Severity::Debug => 7,
        }
    }
}

/// The payload of an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Preformatted text.
    Text(String),
    /// Key/value pairs; formats as `key="value"` separated by spaces.
    Map(IndexMap<String, Value>),
    /// An arbitrary structured payload.
    Json(Value),
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text(text.into())
    }

    /// True when the formatted message would be the empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            Message::Text(text) => text.is_empty(),
            Message::Map(map) => map.is_empty(),
            Message::Json(Value::Null) => true,
            Message::Json(Value::String(text)) => text.is_empty(),
            Message::Json(_) => false,
        }
    }

    /// Writes the formatted message text.
    pub fn write_formatted(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self {
            Message::Text(text) => out.write_str(text),
            Message::Map(map) => {
                for (index, (key, value)) in map.iter().enumerate() {
                    if index > 0 {
                        out.write_char(' ')?;
                    }
                    match value {
                        Value::String(text) => write!(out, "{}=\"{}\"", key, text)?,
                        other => write!(out, "{}=\"{}\"", key, other)?,
                    }
                }
                Ok(())
            }
            Message::Json(Value::Null) => Ok(()),
            Message::Json(Value::String(text)) => out.write_str(text),
            Message::Json(value) => write!(out, "{}", value),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_formatted(f)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

/// A named tag attached to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub name: String,
}

impl Marker {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Metadata of the thread that produced an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub name: String,
    pub id: u64,
    pub priority: i32,
}

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

impl ThreadInfo {
    pub const NORMAL_PRIORITY: i32 = 5;

    /// Describes the calling thread.
    ///
    /// Ids are process-unique and assigned on first use per thread; unnamed
    /// threads are reported as `unnamed`.
    pub fn current() -> Self {
        let thread = std::thread::current();
        Self {
            name: thread.name().unwrap_or("unnamed").to_string(),
            id: THREAD_ID.with(|id| *id),
            priority: Self::NORMAL_PRIORITY,
        }
    }
}

/// One log event.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub message: Message,
    pub level: Level,
    pub logger_name: String,
    /// Fully qualified name of the logging facade class or module.
    pub logger_fqcn: String,
    pub instant: DateTime<Utc>,
    pub thread: ThreadInfo,
    /// Mapped diagnostic context (MDC), in insertion order.
    pub context_data: IndexMap<String, Value>,
    /// Nested diagnostic context (NDC), in push order.
    pub context_stack: Vec<String>,
    pub marker: Option<Marker>,
    pub source: Option<StackFrame>,
    pub thrown: Option<Arc<Throwable>>,
    pub end_of_batch: bool,
}

impl LogEvent {
    /// Creates an event stamped with the current time and thread.
    pub fn new(level: Level, message: impl Into<Message>) -> Self {
        Self {
            message: message.into(),
            level,
            logger_name: String::new(),
            logger_fqcn: String::new(),
            instant: Utc::now(),
            thread: ThreadInfo::current(),
            context_data: IndexMap::new(),
            context_stack: Vec::new(),
            marker: None,
            source: None,
            thrown: None,
            end_of_batch: false,
        }
    }

    pub fn with_logger(mut self, name: impl Into<String>) -> Self {
        self.logger_name = name.into();
        self
    }

    pub fn with_logger_fqcn(mut self, fqcn: impl Into<String>) -> Self {
        self.logger_fqcn = fqcn.into();
        self
    }

    pub fn with_instant(mut self, instant: DateTime<Utc>) -> Self {
        self.instant = instant;
        self
    }

    pub fn with_thread(mut self, thread: ThreadInfo) -> Self {
        self.thread = thread;
        self
    }

    /// Adds one MDC entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context_data.insert(key.into(), value.into());
        self
    }

    /// Replaces the NDC with `items`, bottom of the stack first.
    pub fn with_context_stack<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_stack = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn with_source(mut self, source: StackFrame) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_thrown(mut self, thrown: impl Into<Arc<Throwable>>) -> Self {
        self.thrown = Some(thrown.into());
        self
    }

    pub fn with_end_of_batch(mut self, end_of_batch: bool) -> Self {
        self.end_of_batch = end_of_batch;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(Level::Fatal.severity(), Severity::Emergency);
        assert_eq!(Level::Error.severity().code(), 3);
        assert_eq!(Level::Warn.severity().name(), "WARNING");
        assert_eq!(Level::Info.severity().code(), 6);
        assert_eq!(Level::Debug.severity(), Severity::Debug);
        assert_eq!(Level::Trace.severity().code(), 7);
    }

    #[test]
    fn test_from_log_level() {
        assert_eq!(Level::from(log::Level::Warn), Level::Warn);
        assert_eq!(Level::from(log::Level::Trace), Level::Trace);
    }

    #[test]
    fn test_map_message_formatting() {
        let mut map = IndexMap::new();
        map.insert("user".to_string(), json!("alice"));
        map.insert("attempts".to_string(), json!(3));
        let message = Message::Map(map);
        assert_eq!(message.to_string(), r#"user="alice" attempts="3""#);
        assert!(!message.is_empty());
    }

    #[test]
    fn test_message_emptiness() {
        assert!(Message::text("").is_empty());
        assert!(Message::Json(Value::Null).is_empty());
        assert!(!Message::Json(json!({})).is_empty());
        assert_eq!(Message::Json(json!({"a": 1})).to_string(), r#"{"a":1}"#);
    }

    #[test]
    fn test_thread_ids_are_distinct_per_thread() {
        let here = ThreadInfo::current();
        let there = std::thread::spawn(ThreadInfo::current).join().unwrap();
        assert_ne!(here.id, there.id);
        assert_eq!(here.id, ThreadInfo::current().id);
    }

    #[test]
    fn test_builder_chain() {
        let event = LogEvent::new(Level::Warn, "disk almost full")
            .with_logger("app.disk")
            .with_context("mount", "/var")
            .with_context_stack(["job-1", "step-2"])
            .with_marker(Marker::new("AUDIT"))
            .with_end_of_batch(true);
        assert_eq!(event.logger_name, "app.disk");
        assert_eq!(event.context_stack, vec!["job-1", "step-2"]);
        assert_eq!(event.marker.as_ref().map(|m| m.name.as_str()), Some("AUDIT"));
        assert!(event.end_of_batch);
    }
}

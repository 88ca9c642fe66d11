//! A [`log`] backend that writes every record as one JSON document.
//!
//! ```rust,no_run
//! use jsonlayout::bridge::JsonLogger;
//! use jsonlayout::{JsonLayout, LayoutConfig};
//!
//! let layout = JsonLayout::new(LayoutConfig::new()).unwrap();
//! JsonLogger::new(layout, std::io::stdout())
//!     .with_max_level(log::LevelFilter::Info)
//!     .init()
//!     .unwrap();
//! log::info!("service started");
//! ```
//!
//! Records from this crate's own diagnostics are ignored, so enabling
//! `trace` does not feed the pool's logging back into the pool.

use std::io::{self, Write};

use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

use crate::event::{LogEvent, Message, StackFrame};
use crate::layout::JsonLayout;

const FQCN: &str = "log";

/// Converts a `log` record into an event of the current thread.
///
/// The target becomes the logger name; module path, file and line, when the
/// record carries them, become the source location.
pub fn event_from_record(record: &Record<'_>) -> LogEvent {
    let args = record.args();
    let message = match args.as_str() {
        Some(text) => Message::Text(text.to_string()),
        None => Message::Text(args.to_string()),
    };
    let mut event = LogEvent::new(record.level().into(), message)
        .with_logger(record.target())
        .with_logger_fqcn(FQCN);

    if record.module_path().is_some() || record.file().is_some() {
        let line = record
            .line()
            .and_then(|line| i32::try_from(line).ok())
            .unwrap_or(-1);
        event = event.with_source(StackFrame::new(
            record.module_path().unwrap_or(""),
            "",
            record.file(),
            line,
        ));
    }
    event
}

fn is_own_target(target: &str) -> bool {
    target == "jsonlayout" || target.starts_with("jsonlayout::")
}

/// Writes records through a [`JsonLayout`] into a shared writer.
///
/// Compact documents are followed by the layout's line separator; pretty
/// documents already end with it.
pub struct JsonLogger<W: Write + Send> {
    layout: JsonLayout,
    writer: Mutex<W>,
    max_level: LevelFilter,
}

impl<W: Write + Send> JsonLogger<W> {
    pub fn new(layout: JsonLayout, writer: W) -> Self {
        Self {
            layout,
            writer: Mutex::new(writer),
            max_level: LevelFilter::Trace,
        }
    }

    pub fn with_max_level(mut self, level: LevelFilter) -> Self {
        self.max_level = level;
        self
    }

    pub fn layout(&self) -> &JsonLayout {
        &self.layout
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    /// Writes one record, reporting render and I/O failures.
    pub fn write_record(&self, record: &Record<'_>) -> io::Result<()> {
        let event = event_from_record(record);
        let config = self.layout.config();
        let separator = (!config.pretty_print).then_some(config.line_separator.as_bytes());
        self.layout
            .render_with(&event, |bytes| -> io::Result<()> {
                let mut writer = self.writer.lock();
                writer.write_all(bytes)?;
                if let Some(separator) = separator {
                    writer.write_all(separator)?;
                }
                Ok(())
            })
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?
    }
}

impl<W: Write + Send + 'static> JsonLogger<W> {
    /// Installs this logger as the global `log` backend.
    pub fn init(self) -> Result<(), log::SetLoggerError> {
        let max_level = self.max_level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl<W: Write + Send> Log for JsonLogger<W> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.max_level && !is_own_target(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Err(err) = self.write_record(record) {
            // log::warn! would re-enter this logger, which drops our own targets
            eprintln!("jsonlayout: dropped a log record: {}", err);
        }
    }

    fn flush(&self) {
        let _ = self.writer.lock().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::event::Level;
    use serde_json::{json, Value};

    fn logger(config: LayoutConfig) -> JsonLogger<Vec<u8>> {
        JsonLogger::new(JsonLayout::new(config).unwrap(), Vec::new())
    }

    fn template() -> LayoutConfig {
        LayoutConfig::new().with_event_template(
            r#"{
                "level": "${json:level}",
                "logger": "${json:logger:name}",
                "message": "${json:message}",
                "line": "${json:source:lineNumber}"
            }"#,
        )
    }

    #[test]
    fn test_event_from_record() {
        let event = event_from_record(
            &Record::builder()
                .args(format_args!("started in {}ms", 12))
                .level(log::Level::Warn)
                .target("app::boot")
                .module_path(Some("app::boot"))
                .file(Some("src/boot.rs"))
                .line(Some(42))
                .build(),
        );
        assert_eq!(event.level, Level::Warn);
        assert_eq!(event.logger_name, "app::boot");
        assert_eq!(event.logger_fqcn, "log");
        assert_eq!(event.message.to_string(), "started in 12ms");
        let source = event.source.unwrap();
        assert_eq!(source.class_name, "app::boot");
        assert_eq!(source.file_name.as_deref(), Some("src/boot.rs"));
        assert_eq!(source.line_number, 42);
    }

    #[test]
    fn test_records_are_line_delimited() {
        let logger = logger(template().with_location_info(true));
        for n in 0..3 {
            logger
                .write_record(
                    &Record::builder()
                        .args(format_args!("n={}", n))
                        .level(log::Level::Info)
                        .target("app")
                        .line(Some(7))
                        .file(Some("main.rs"))
                        .build(),
                )
                .unwrap();
        }
        let output = String::from_utf8(logger.into_inner()).unwrap();
        let lines: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[2],
            json!({"level": "INFO", "logger": "app", "message": "n=2", "line": 7})
        );
    }

    #[test]
    fn test_level_filter_and_own_target() {
        let logger = logger(template()).with_max_level(LevelFilter::Info);
        let debug = Metadata::builder()
            .level(log::Level::Debug)
            .target("app")
            .build();
        let own = Metadata::builder()
            .level(log::Level::Error)
            .target("jsonlayout::pool")
            .build();
        let other = Metadata::builder()
            .level(log::Level::Error)
            .target("jsonlayout_demo")
            .build();
        assert!(!logger.enabled(&debug));
        assert!(!logger.enabled(&own));
        assert!(logger.enabled(&other));
    }
}

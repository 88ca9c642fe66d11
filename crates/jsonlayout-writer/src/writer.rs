//! Streaming JSON document writer.
//!
//! [`JsonWriter`] emits JSON tokens straight into a [`FixedBuffer`], using
//! `serde_json`'s [`Formatter`] implementations for the actual token layout
//! ([`CompactFormatter`] or [`PrettyFormatter`]). It keeps its own structural
//! state so callers can ask whether the document is back at the root.
//!
//! ## Deferred field names
//!
//! A field name is not written when [`JsonWriter::write_field_name`] is called.
//! It is held until a value arrives, which gives the writer two abilities:
//!
//! - A producer may decide to write *nothing* for a field; calling
//!   [`JsonWriter::discard_field_name`] then drops the name and the field is
//!   omitted from the object.
//! - In null-filtering mode ([`WriterOptions::filter_nulls`]) a `null` value
//!   drops its field name (or array slot) instead of being written.
//!
//! ## Output modes
//!
//! | Mode | Between root documents | After a root object/array closes |
//! |------|------------------------|----------------------------------|
//! | compact | nothing | nothing |
//! | pretty | nothing | [`WriterOptions::line_separator`] |
//!
//! ```rust
//! use jsonlayout_writer::{JsonWriter, WriterOptions};
//!
//! let mut writer = JsonWriter::new(256, WriterOptions::default());
//! writer.start_object().unwrap();
//! writer.write_field_name("msg").unwrap();
//! writer.write_string("hello").unwrap();
//! writer.end_object().unwrap();
//!
//! assert!(writer.is_at_root());
//! assert_eq!(writer.as_bytes(), br#"{"msg":"hello"}"#);
//! ```

use std::fmt;
use std::io;

use serde_json::ser::{CharEscape, CompactFormatter, Formatter, PrettyFormatter};
use serde_json::Value;

use crate::buffer::FixedBuffer;
use crate::error::{Result, WriteError};

/// Dispatches a `Formatter` method on whichever formatter the writer uses,
/// passing the writer's buffer as the output.
macro_rules! emit {
    ($self:ident . $method:ident ( $($arg:expr),* )) => {
        match &mut $self.style {
            Style::Compact(f) => f.$method(&mut $self.buffer $(, $arg)*),
            Style::Pretty(f) => f.$method(&mut $self.buffer $(, $arg)*),
        }
    };
}

/// Options fixed for the lifetime of a [`JsonWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// Human-readable indentation instead of the compact form.
    pub pretty: bool,

    /// Omit object fields and array elements whose value is `null`.
    pub filter_nulls: bool,

    /// Truncate string values and field names to this many characters.
    /// Zero disables truncation.
    pub max_string_length: usize,

    /// Appended after each root object or array in pretty mode.
    pub line_separator: String,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            filter_nulls: false,
            max_string_length: 0,
            line_separator: "\n".to_string(),
        }
    }
}

enum Style {
    Compact(CompactFormatter),
    Pretty(PrettyFormatter<'static>),
}

impl Style {
    fn new(pretty: bool) -> Self {
        if pretty {
            Style::Pretty(PrettyFormatter::with_indent(b"  "))
        } else {
            Style::Compact(CompactFormatter)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    scope: Scope,
    first: bool,
}

/// Writes JSON tokens into an owned fixed-capacity buffer.
///
/// Every `start_*` call pushes a structural frame and every matching `end_*`
/// pops it; [`depth`](Self::depth) and [`is_at_root`](Self::is_at_root)
/// expose that state. [`reset`](Self::reset) returns the writer and its buffer
/// to the empty root state, whatever happened before (including overflow).
pub struct JsonWriter {
    buffer: FixedBuffer,
    style: Style,
    frames: Vec<Frame>,
    pending_key: String,
    has_pending_key: bool,
    options: WriterOptions,
}

impl JsonWriter {
    /// Creates a writer over a new buffer of `capacity` bytes.
    pub fn new(capacity: usize, options: WriterOptions) -> Self {
        Self {
            buffer: FixedBuffer::new(capacity),
            style: Style::new(options.pretty),
            frames: Vec::with_capacity(16),
            pending_key: String::with_capacity(64),
            has_pending_key: false,
            options,
        }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    pub fn buffer(&self) -> &FixedBuffer {
        &self.buffer
    }

    /// The bytes written since the last reset.
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Number of currently open objects and arrays.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// True when no structure is open and no field name is pending.
    pub fn is_at_root(&self) -> bool {
        self.frames.is_empty() && !self.has_pending_key
    }

    /// Clears the buffer, the overflow flag, and all structural state.
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.style = Style::new(self.options.pretty);
        self.frames.clear();
        self.pending_key.clear();
        self.has_pending_key = false;
    }

    pub fn start_object(&mut self) -> Result<()> {
        self.begin_value()?;
        let result = emit!(self.begin_object());
        self.check(result)?;
        self.frames.push(Frame {
            scope: Scope::Object,
            first: true,
        });
        Ok(())
    }

    pub fn end_object(&mut self) -> Result<()> {
        self.end_scope(Scope::Object)
    }

    pub fn start_array(&mut self) -> Result<()> {
        self.begin_value()?;
        let result = emit!(self.begin_array());
        self.check(result)?;
        self.frames.push(Frame {
            scope: Scope::Array,
            first: true,
        });
        Ok(())
    }

    pub fn end_array(&mut self) -> Result<()> {
        self.end_scope(Scope::Array)
    }

    /// Sets the name of the next object member.
    ///
    /// The name is only written once a value follows it.
    pub fn write_field_name(&mut self, name: &str) -> Result<()> {
        match self.frames.last() {
            Some(frame) if frame.scope == Scope::Object => {}
            _ => return Err(WriteError::InvalidState("field name outside of an object")),
        }
        if self.has_pending_key {
            return Err(WriteError::InvalidState("field name without a value"));
        }
        self.pending_key.clear();
        self.pending_key.push_str(name);
        self.has_pending_key = true;
        Ok(())
    }

    /// Drops a pending field name, omitting that member from the object.
    ///
    /// A no-op when the pending name was already consumed by a value.
    pub fn discard_field_name(&mut self) {
        self.has_pending_key = false;
    }

    pub fn write_null(&mut self) -> Result<()> {
        if self.options.filter_nulls && !self.frames.is_empty() {
            self.has_pending_key = false;
            return Ok(());
        }
        self.begin_value()?;
        let result = emit!(self.write_null());
        self.check(result)?;
        self.end_value()
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.begin_value()?;
        let result = emit!(self.write_bool(value));
        self.check(result)?;
        self.end_value()
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_i64(i64::from(value))
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.begin_value()?;
        let result = emit!(self.write_i64(value));
        self.check(result)?;
        self.end_value()
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.begin_value()?;
        let result = emit!(self.write_u64(value));
        self.check(result)?;
        self.end_value()
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_f64(f64::from(value))
    }

    /// Writes a float; NaN and infinities have no JSON form and become `null`.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return self.write_null();
        }
        self.begin_value()?;
        let result = emit!(self.write_f64(value));
        self.check(result)?;
        self.end_value()
    }

    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.begin_value()?;
        let value = truncate_chars(value, self.options.max_string_length);
        let result = match &mut self.style {
            Style::Compact(f) => write_quoted(f, &mut self.buffer, value),
            Style::Pretty(f) => write_quoted(f, &mut self.buffer, value),
        };
        self.check(result)?;
        self.end_value()
    }

    /// Writes a string value whose content is produced through [`fmt::Write`].
    ///
    /// The text is escaped as it streams into the buffer, so nothing is
    /// collected in an intermediate `String`.
    ///
    /// ```rust
    /// use std::fmt::Write;
    /// use jsonlayout_writer::{JsonWriter, WriterOptions};
    ///
    /// let mut writer = JsonWriter::new(64, WriterOptions::default());
    /// writer
    ///     .write_string_with(|out| write!(out, "line {}\n", 42))
    ///     .unwrap();
    /// assert_eq!(writer.as_bytes(), br#""line 42\n""#);
    /// ```
    pub fn write_string_with<F>(&mut self, produce: F) -> Result<()>
    where
        F: FnOnce(&mut dyn fmt::Write) -> fmt::Result,
    {
        self.begin_value()?;
        let result = emit!(self.begin_string());
        self.check(result)?;

        let limit = self.options.max_string_length;
        let mut sink = StringSink {
            style: &mut self.style,
            buffer: &mut self.buffer,
            remaining: if limit == 0 { None } else { Some(limit) },
        };
        if produce(&mut sink).is_err() {
            return Err(if self.buffer.is_overflowed() {
                WriteError::Overflow {
                    capacity: self.buffer.capacity(),
                }
            } else {
                WriteError::Format
            });
        }

        let result = emit!(self.end_string());
        self.check(result)?;
        self.end_value()
    }

    /// Writes an already-encoded JSON value verbatim.
    pub fn write_raw(&mut self, json: &str) -> Result<()> {
        self.begin_value()?;
        let result = emit!(self.write_raw_fragment(json));
        self.check(result)?;
        self.end_value()
    }

    /// Writes a `serde_json::Value` tree token by token.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.write_null(),
            Value::Bool(b) => self.write_bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    self.write_i64(i)
                } else if let Some(u) = n.as_u64() {
                    self.write_u64(u)
                } else {
                    match n.as_f64() {
                        Some(f) => self.write_f64(f),
                        None => self.write_raw(&n.to_string()),
                    }
                }
            }
            Value::String(s) => self.write_string(s),
            Value::Array(items) => {
                self.start_array()?;
                for item in items {
                    self.write_value(item)?;
                }
                self.end_array()
            }
            Value::Object(map) => {
                self.start_object()?;
                for (key, item) in map {
                    self.write_field_name(key)?;
                    self.write_value(item)?;
                }
                self.end_object()
            }
        }
    }

    fn begin_value(&mut self) -> Result<()> {
        let (scope, first) = match self.frames.last_mut() {
            None => return Ok(()),
            Some(frame) => {
                let first = frame.first;
                frame.first = false;
                (frame.scope, first)
            }
        };
        match scope {
            Scope::Array => {
                let result = emit!(self.begin_array_value(first));
                self.check(result)
            }
            Scope::Object => {
                if !self.has_pending_key {
                    return Err(WriteError::InvalidState(
                        "object member written without a field name",
                    ));
                }
                self.has_pending_key = false;
                let key = truncate_chars(&self.pending_key, self.options.max_string_length);
                let result = match &mut self.style {
                    Style::Compact(f) => write_member_key(f, &mut self.buffer, key, first),
                    Style::Pretty(f) => write_member_key(f, &mut self.buffer, key, first),
                };
                self.check(result)
            }
        }
    }

    fn end_value(&mut self) -> Result<()> {
        let result = match self.frames.last().map(|frame| frame.scope) {
            Some(Scope::Object) => emit!(self.end_object_value()),
            Some(Scope::Array) => emit!(self.end_array_value()),
            None => return Ok(()),
        };
        self.check(result)
    }

    fn end_scope(&mut self, scope: Scope) -> Result<()> {
        match self.frames.last() {
            Some(frame) if frame.scope == scope => {}
            _ => return Err(WriteError::InvalidState("unbalanced end of object or array")),
        }
        self.frames.pop();
        self.has_pending_key = false;
        let result = match scope {
            Scope::Object => emit!(self.end_object()),
            Scope::Array => emit!(self.end_array()),
        };
        self.check(result)?;
        self.end_value()?;

        if self.frames.is_empty()
            && matches!(self.style, Style::Pretty(_))
            && !self.options.line_separator.is_empty()
        {
            self.buffer
                .write_bytes(self.options.line_separator.as_bytes())?;
        }
        Ok(())
    }

    // The buffer is the only sink, so any I/O failure is an overflow.
    fn check(&self, result: io::Result<()>) -> Result<()> {
        result.map_err(|_| WriteError::Overflow {
            capacity: self.buffer.capacity(),
        })
    }
}

impl fmt::Debug for JsonWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonWriter")
            .field("len", &self.buffer.len())
            .field("capacity", &self.buffer.capacity())
            .field("depth", &self.frames.len())
            .field("options", &self.options)
            .finish()
    }
}

/// Escaping `fmt::Write` adapter used by [`JsonWriter::write_string_with`].
struct StringSink<'a> {
    style: &'a mut Style,
    buffer: &'a mut FixedBuffer,
    remaining: Option<usize>,
}

impl fmt::Write for StringSink<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let s = match self.remaining.as_mut() {
            None => s,
            Some(0) => return Ok(()),
            Some(remaining) => {
                let kept = truncate_chars(s, *remaining);
                *remaining -= kept.chars().count();
                kept
            }
        };
        let result = match self.style {
            Style::Compact(f) => write_escaped(f, self.buffer, s),
            Style::Pretty(f) => write_escaped(f, self.buffer, s),
        };
        result.map_err(|_| fmt::Error)
    }
}

fn write_member_key<F: Formatter>(
    f: &mut F,
    out: &mut FixedBuffer,
    key: &str,
    first: bool,
) -> io::Result<()> {
    f.begin_object_key(out, first)?;
    write_quoted(f, out, key)?;
    f.end_object_key(out)?;
    f.begin_object_value(out)
}

fn write_quoted<F: Formatter>(f: &mut F, out: &mut FixedBuffer, value: &str) -> io::Result<()> {
    f.begin_string(out)?;
    write_escaped(f, out, value)?;
    f.end_string(out)
}

fn write_escaped<F: Formatter>(f: &mut F, out: &mut FixedBuffer, value: &str) -> io::Result<()> {
    let bytes = value.as_bytes();
    let mut start = 0;
    for (index, &byte) in bytes.iter().enumerate() {
        let escape = match byte {
            b'"' => CharEscape::Quote,
            b'\\' => CharEscape::ReverseSolidus,
            b'\x08' => CharEscape::Backspace,
            b'\x0c' => CharEscape::FormFeed,
            b'\n' => CharEscape::LineFeed,
            b'\r' => CharEscape::CarriageReturn,
            b'\t' => CharEscape::Tab,
            0x00..=0x1f => CharEscape::AsciiControl(byte),
            _ => continue,
        };
        if start < index {
            f.write_string_fragment(out, &value[start..index])?;
        }
        f.write_char_escape(out, escape)?;
        start = index + 1;
    }
    if start < bytes.len() {
        f.write_string_fragment(out, &value[start..])?;
    }
    Ok(())
}

/// The first `limit` characters of `value`; the whole string when `limit` is zero.
fn truncate_chars(value: &str, limit: usize) -> &str {
    if limit == 0 {
        return value;
    }
    match value.char_indices().nth(limit) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}

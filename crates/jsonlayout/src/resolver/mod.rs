//! Resolvers: the executable leaves of a compiled template.
//!
//! A resolver extracts one fact from a subject and writes it as at most one
//! JSON value. Two subject types exist, each with its own registry:
//!
//! - [`LogEvent`](crate::event::LogEvent), resolved by [`EventResolver`]
//!   (directives such as `${json:level}` or `${json:exception:className}`)
//! - [`StackFrame`](crate::event::StackFrame), resolved by [`FrameResolver`]
//!   (`${json:stackTraceElement:KEY}`), used for each element of
//!   `${json:exception:stackTrace}`
//!
//! ## Null versus absent
//!
//! Scalar resolvers always write exactly one value and fall back to `null`
//! when the fact is missing, gated off, or an excluded empty string.
//! Collection resolvers (the MDC map, the NDC array, stack trace arrays)
//! write nothing at all when the collection is empty, and the renderer drops
//! the field or array slot they were meant to fill.

mod context;
mod context_data;
mod event;
mod exception;
mod frame;
mod registry;
mod timestamp;

pub(crate) use context::{EventContext, FrameContext};
pub(crate) use event::{EventResolver, EVENT_RESOLVERS};
pub(crate) use frame::{FrameResolver, FRAME_RESOLVERS};
pub(crate) use registry::ResolverRegistry;
pub use timestamp::TimeZoneSpec;

use jsonlayout_writer::{JsonWriter, WriteError};

use crate::error::RenderError;

/// Writes one fact of a subject of type `S`.
pub(crate) trait TemplateResolver<S: ?Sized>: Send + Sync {
    fn resolve(&self, subject: &S, writer: &mut JsonWriter) -> Result<(), RenderError>;
}

/// Writes `text`, or `null` when it is missing or an excluded empty string.
pub(crate) fn write_text(
    writer: &mut JsonWriter,
    text: Option<&str>,
    exclude_empty: bool,
) -> Result<(), WriteError> {
    match text {
        Some(text) if !(exclude_empty && text.is_empty()) => writer.write_string(text),
        _ => writer.write_null(),
    }
}

/// Writes a context value, treating an empty string like a missing one when
/// exclusion is on.
pub(crate) fn write_context_value(
    writer: &mut JsonWriter,
    value: Option<&serde_json::Value>,
    exclude_empty: bool,
) -> Result<(), WriteError> {
    match value {
        Some(serde_json::Value::String(text)) => write_text(writer, Some(text), exclude_empty),
        Some(value) => writer.write_value(value),
        None => writer.write_null(),
    }
}

/// True for values dropped from maps when exclusion is on.
pub(crate) fn is_excluded_value(value: &serde_json::Value, exclude_empty: bool) -> bool {
    exclude_empty
        && match value {
            serde_json::Value::Null => true,
            serde_json::Value::String(text) => text.is_empty(),
            _ => false,
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonlayout_writer::WriterOptions;
    use serde_json::json;

    fn render(f: impl FnOnce(&mut JsonWriter)) -> String {
        let mut writer = JsonWriter::new(128, WriterOptions::default());
        writer.start_array().unwrap();
        f(&mut writer);
        writer.end_array().unwrap();
        String::from_utf8(writer.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_write_text_exclusion() {
        let out = render(|w| {
            write_text(w, Some("a"), true).unwrap();
            write_text(w, Some(""), true).unwrap();
            write_text(w, Some(""), false).unwrap();
            write_text(w, None, false).unwrap();
        });
        assert_eq!(out, r#"["a",null,"",null]"#);
    }

    #[test]
    fn test_write_context_value() {
        let out = render(|w| {
            write_context_value(w, Some(&json!(3)), true).unwrap();
            write_context_value(w, Some(&json!("")), true).unwrap();
            write_context_value(w, Some(&json!({"k": "v"})), true).unwrap();
        });
        assert_eq!(out, r#"[3,null,{"k":"v"}]"#);
    }

    #[test]
    fn test_is_excluded_value() {
        assert!(is_excluded_value(&json!(null), true));
        assert!(is_excluded_value(&json!(""), true));
        assert!(!is_excluded_value(&json!(""), false));
        assert!(!is_excluded_value(&json!(0), true));
    }
}

//! `${json:mdc}` and `${json:ndc}`: the event's diagnostic contexts.

use jsonlayout_writer::JsonWriter;
use regex::Regex;

use super::{is_excluded_value, write_context_value};
use crate::error::RenderError;
use crate::event::LogEvent;

/// The mapped diagnostic context, whole or one key of it.
#[derive(Debug, Clone)]
pub(crate) enum ContextDataResolver {
    /// One value; `null` when the key is missing.
    Key { key: String, exclude_empty: bool },
    /// Every entry whose key matches the pattern; absent when none qualifies.
    All {
        key_pattern: Option<Regex>,
        exclude_empty: bool,
    },
}

impl ContextDataResolver {
    pub(crate) fn resolve(&self, event: &LogEvent, writer: &mut JsonWriter) -> Result<(), RenderError> {
        match self {
            ContextDataResolver::Key { key, exclude_empty } => {
                write_context_value(writer, event.context_data.get(key.as_str()), *exclude_empty)?;
            }
            ContextDataResolver::All {
                key_pattern,
                exclude_empty,
            } => {
                let included = |key: &str, value: &serde_json::Value| {
                    key_pattern.as_ref().map_or(true, |p| p.is_match(key))
                        && !is_excluded_value(value, *exclude_empty)
                };
                if !event
                    .context_data
                    .iter()
                    .any(|(key, value)| included(key, value))
                {
                    return Ok(());
                }
                writer.start_object()?;
                for (key, value) in &event.context_data {
                    if included(key, value) {
                        writer.write_field_name(key)?;
                        writer.write_value(value)?;
                    }
                }
                writer.end_object()?;
            }
        }
        Ok(())
    }
}

/// The nested diagnostic context as an array, bottom of the stack first.
#[derive(Debug, Clone)]
pub(crate) struct ContextStackResolver {
    pub(crate) pattern: Option<Regex>,
    pub(crate) exclude_empty: bool,
}

impl ContextStackResolver {
    fn included(&self, item: &str) -> bool {
        !(self.exclude_empty && item.is_empty())
            && self.pattern.as_ref().map_or(true, |p| p.is_match(item))
    }

    pub(crate) fn resolve(&self, event: &LogEvent, writer: &mut JsonWriter) -> Result<(), RenderError> {
        if !event.context_stack.iter().any(|item| self.included(item)) {
            return Ok(());
        }
        writer.start_array()?;
        for item in &event.context_stack {
            if self.included(item) {
                writer.write_string(item)?;
            }
        }
        writer.end_array()?;
        Ok(())
    }
}

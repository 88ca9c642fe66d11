//! The event resolver registry and its resolvers.
//!
//! | Name | Keys |
//! |------|------|
//! | `mdc` | none (whole map) or `KEY` |
//! | `ndc` | none |
//! | `endOfBatch` | none |
//! | `exception` | `className`, `message`, `stackTrace`, `stackTrace:text` |
//! | `exceptionRootCause` | same as `exception` |
//! | `level` | none, `severity`, `severity:code` |
//! | `logger` | `name`, `fqcn` |
//! | `main` | argument index or flag |
//! | `map` | `KEY` of a map message |
//! | `marker` | `name` |
//! | `message` | none or `json` |
//! | `source` | `className`, `fileName`, `lineNumber`, `methodName` |
//! | `thread` | `name`, `id`, `priority` |
//! | `timestamp` | none or `epoch[:divisor=D[,integral]]` |

use std::fmt;
use std::sync::Arc;

use jsonlayout_writer::JsonWriter;
use once_cell::sync::Lazy;
use serde_json::Value;

use super::context::EventContext;
use super::context_data::{ContextDataResolver, ContextStackResolver};
use super::exception::ExceptionResolver;
use super::registry::ResolverRegistry;
use super::timestamp::TimestampResolver;
use super::{is_excluded_value, write_context_value, write_text, TemplateResolver};
use crate::error::{RenderError, TemplateError};
use crate::event::{LogEvent, Message};
use crate::substitutor::Substitutor;

pub(crate) static EVENT_RESOLVERS: Lazy<ResolverRegistry<EventContext, EventResolver>> =
    Lazy::new(|| {
        ResolverRegistry::<EventContext, EventResolver>::new()
            .register("mdc", create_context_data)
            .register("ndc", create_context_stack)
            .register("endOfBatch", create_end_of_batch)
            .register("exception", create_exception)
            .register("exceptionRootCause", create_exception_root_cause)
            .register("level", create_level)
            .register("logger", create_logger)
            .register("main", create_main)
            .register("map", create_map)
            .register("marker", create_marker)
            .register("message", create_message)
            .register("source", create_source)
            .register("thread", create_thread)
            .register("timestamp", create_timestamp)
    });

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LevelField {
    Name,
    SeverityName,
    SeverityCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoggerField {
    Name,
    Fqcn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceField {
    /// Location info is off; always `null`.
    Disabled,
    ClassName,
    FileName,
    LineNumber,
    MethodName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThreadField {
    Name,
    Id,
    Priority,
}

/// A non-directive string with `${...}` lookups, substituted per event.
#[derive(Clone)]
pub(crate) struct SubstitutionResolver {
    pub(crate) text: Box<str>,
    pub(crate) substitutor: Arc<dyn Substitutor>,
    pub(crate) exclude_empty: bool,
}

impl fmt::Debug for SubstitutionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubstitutionResolver")
            .field("text", &self.text)
            .field("exclude_empty", &self.exclude_empty)
            .finish_non_exhaustive()
    }
}

/// Every resolver an event template can contain.
#[derive(Debug, Clone)]
pub(crate) enum EventResolver {
    ContextData(ContextDataResolver),
    ContextStack(ContextStackResolver),
    EndOfBatch,
    Exception(ExceptionResolver),
    Level(LevelField),
    Logger {
        field: LoggerField,
        exclude_empty: bool,
    },
    /// Main arguments never change, so the value is looked up once.
    Main {
        value: Option<String>,
        exclude_empty: bool,
    },
    Map {
        key: String,
        exclude_empty: bool,
    },
    Marker {
        exclude_empty: bool,
    },
    Message {
        json: bool,
        exclude_empty: bool,
    },
    Source {
        field: SourceField,
        exclude_empty: bool,
    },
    Thread {
        field: ThreadField,
        exclude_empty: bool,
    },
    Timestamp(TimestampResolver),
    Substitution(SubstitutionResolver),
}

impl TemplateResolver<LogEvent> for EventResolver {
    fn resolve(&self, event: &LogEvent, writer: &mut JsonWriter) -> Result<(), RenderError> {
        match self {
            EventResolver::ContextData(resolver) => return resolver.resolve(event, writer),
            EventResolver::ContextStack(resolver) => return resolver.resolve(event, writer),
            EventResolver::Exception(resolver) => return resolver.resolve(event, writer),
            EventResolver::Timestamp(resolver) => return resolver.resolve(&event.instant, writer),
            EventResolver::EndOfBatch => writer.write_bool(event.end_of_batch)?,
            EventResolver::Level(field) => {
                let level = event.level;
                match field {
                    LevelField::Name => writer.write_string(level.name())?,
                    LevelField::SeverityName => writer.write_string(level.severity().name())?,
                    LevelField::SeverityCode => {
                        writer.write_i64(i64::from(level.severity().code()))?
                    }
                }
            }
            EventResolver::Logger {
                field,
                exclude_empty,
            } => {
                let text = match field {
                    LoggerField::Name => &event.logger_name,
                    LoggerField::Fqcn => &event.logger_fqcn,
                };
                write_text(writer, Some(text), *exclude_empty)?
            }
            EventResolver::Main {
                value,
                exclude_empty,
            } => write_text(writer, value.as_deref(), *exclude_empty)?,
            EventResolver::Map { key, exclude_empty } => match &event.message {
                Message::Map(map) => {
                    write_context_value(writer, map.get(key.as_str()), *exclude_empty)?
                }
                _ => writer.write_null()?,
            },
            EventResolver::Marker { exclude_empty } => write_text(
                writer,
                event.marker.as_ref().map(|marker| marker.name.as_str()),
                *exclude_empty,
            )?,
            EventResolver::Message {
                json,
                exclude_empty,
            } => resolve_message(&event.message, *json, *exclude_empty, writer)?,
            EventResolver::Source {
                field,
                exclude_empty,
            } => match (field, &event.source) {
                (SourceField::Disabled, _) | (_, None) => writer.write_null()?,
                (SourceField::ClassName, Some(source)) => {
                    write_text(writer, Some(&source.class_name), *exclude_empty)?
                }
                (SourceField::MethodName, Some(source)) => {
                    write_text(writer, Some(&source.method_name), *exclude_empty)?
                }
                (SourceField::FileName, Some(source)) => {
                    write_text(writer, source.file_name.as_deref(), *exclude_empty)?
                }
                (SourceField::LineNumber, Some(source)) => writer.write_i32(source.line_number)?,
            },
            EventResolver::Thread {
                field,
                exclude_empty,
            } => match field {
                ThreadField::Name => write_text(writer, Some(&event.thread.name), *exclude_empty)?,
                ThreadField::Id => writer.write_u64(event.thread.id)?,
                ThreadField::Priority => writer.write_i32(event.thread.priority)?,
            },
            EventResolver::Substitution(resolver) => {
                let text = resolver.substitutor.substitute(&resolver.text, Some(event));
                write_text(writer, Some(&text), resolver.exclude_empty)?
            }
        }
        Ok(())
    }
}

fn resolve_message(
    message: &Message,
    json: bool,
    exclude_empty: bool,
    writer: &mut JsonWriter,
) -> Result<(), RenderError> {
    if !json {
        if exclude_empty && message.is_empty() {
            writer.write_null()?;
        } else if let Message::Text(text) = message {
            writer.write_string(text)?;
        } else {
            writer.write_string_with(|out| message.write_formatted(out))?;
        }
        return Ok(());
    }

    match message {
        Message::Text(text) if exclude_empty && text.is_empty() => writer.write_null()?,
        Message::Json(value) if exclude_empty && is_empty_json(value) => writer.write_null()?,
        Message::Text(text) => {
            writer.start_object()?;
            writer.write_field_name("message")?;
            write_text(writer, Some(text), exclude_empty)?;
            writer.end_object()?;
        }
        Message::Map(map) => {
            writer.start_object()?;
            for (key, value) in map {
                if !is_excluded_value(value, exclude_empty) {
                    writer.write_field_name(key)?;
                    writer.write_value(value)?;
                }
            }
            writer.end_object()?;
        }
        Message::Json(value) => writer.write_value(value)?,
    }
    Ok(())
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

fn no_key(resolver: &'static str, key: Option<&str>) -> Result<(), TemplateError> {
    match key {
        None => Ok(()),
        Some(key) => Err(TemplateError::UnknownKey {
            resolver,
            key: key.to_string(),
        }),
    }
}

fn required_key<'a>(resolver: &'static str, key: Option<&'a str>) -> Result<&'a str, TemplateError> {
    key.ok_or(TemplateError::MissingKey { resolver })
}

fn unknown_key(resolver: &'static str, key: &str) -> TemplateError {
    TemplateError::UnknownKey {
        resolver,
        key: key.to_string(),
    }
}

fn create_context_data(context: &EventContext, key: Option<&str>) -> Result<EventResolver, TemplateError> {
    let exclude_empty = context.exclude_empty;
    Ok(EventResolver::ContextData(match key {
        Some(key) => ContextDataResolver::Key {
            key: key.to_string(),
            exclude_empty,
        },
        None => ContextDataResolver::All {
            key_pattern: context.mdc_key_pattern.clone(),
            exclude_empty,
        },
    }))
}

fn create_context_stack(context: &EventContext, key: Option<&str>) -> Result<EventResolver, TemplateError> {
    no_key("ndc", key)?;
    Ok(EventResolver::ContextStack(ContextStackResolver {
        pattern: context.ndc_pattern.clone(),
        exclude_empty: context.exclude_empty,
    }))
}

fn create_end_of_batch(_: &EventContext, key: Option<&str>) -> Result<EventResolver, TemplateError> {
    no_key("endOfBatch", key)?;
    Ok(EventResolver::EndOfBatch)
}

fn create_exception(context: &EventContext, key: Option<&str>) -> Result<EventResolver, TemplateError> {
    ExceptionResolver::create(context, "exception", false, key).map(EventResolver::Exception)
}

fn create_exception_root_cause(
    context: &EventContext,
    key: Option<&str>,
) -> Result<EventResolver, TemplateError> {
    ExceptionResolver::create(context, "exceptionRootCause", true, key)
        .map(EventResolver::Exception)
}

fn create_level(_: &EventContext, key: Option<&str>) -> Result<EventResolver, TemplateError> {
    let field = match key {
        None => LevelField::Name,
        Some("severity") => LevelField::SeverityName,
        Some("severity:code") => LevelField::SeverityCode,
        Some(other) => return Err(unknown_key("level", other)),
    };
    Ok(EventResolver::Level(field))
}

fn create_logger(context: &EventContext, key: Option<&str>) -> Result<EventResolver, TemplateError> {
    let field = match required_key("logger", key)? {
        "name" => LoggerField::Name,
        "fqcn" => LoggerField::Fqcn,
        other => return Err(unknown_key("logger", other)),
    };
    Ok(EventResolver::Logger {
        field,
        exclude_empty: context.exclude_empty,
    })
}

fn create_main(context: &EventContext, key: Option<&str>) -> Result<EventResolver, TemplateError> {
    let key = required_key("main", key)?;
    Ok(EventResolver::Main {
        value: context.main_args.get(key).map(str::to_string),
        exclude_empty: context.exclude_empty,
    })
}

fn create_map(context: &EventContext, key: Option<&str>) -> Result<EventResolver, TemplateError> {
    Ok(EventResolver::Map {
        key: required_key("map", key)?.to_string(),
        exclude_empty: context.exclude_empty,
    })
}

fn create_marker(context: &EventContext, key: Option<&str>) -> Result<EventResolver, TemplateError> {
    match required_key("marker", key)? {
        "name" => Ok(EventResolver::Marker {
            exclude_empty: context.exclude_empty,
        }),
        other => Err(unknown_key("marker", other)),
    }
}

fn create_message(context: &EventContext, key: Option<&str>) -> Result<EventResolver, TemplateError> {
    let json = match key {
        None => false,
        Some("json") => true,
        Some(other) => return Err(unknown_key("message", other)),
    };
    Ok(EventResolver::Message {
        json,
        exclude_empty: context.exclude_empty,
    })
}

fn create_source(context: &EventContext, key: Option<&str>) -> Result<EventResolver, TemplateError> {
    let field = match required_key("source", key)? {
        "className" => SourceField::ClassName,
        "fileName" => SourceField::FileName,
        "lineNumber" => SourceField::LineNumber,
        "methodName" => SourceField::MethodName,
        other => return Err(unknown_key("source", other)),
    };
    Ok(EventResolver::Source {
        field: if context.location_info {
            field
        } else {
            SourceField::Disabled
        },
        exclude_empty: context.exclude_empty,
    })
}

fn create_thread(context: &EventContext, key: Option<&str>) -> Result<EventResolver, TemplateError> {
    let field = match required_key("thread", key)? {
        "name" => ThreadField::Name,
        "id" => ThreadField::Id,
        "priority" => ThreadField::Priority,
        other => return Err(unknown_key("thread", other)),
    };
    Ok(EventResolver::Thread {
        field,
        exclude_empty: context.exclude_empty,
    })
}

fn create_timestamp(context: &EventContext, key: Option<&str>) -> Result<EventResolver, TemplateError> {
    TimestampResolver::create(&context.timestamp_format, key).map(EventResolver::Timestamp)
}

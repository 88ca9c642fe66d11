//! `${json:exception:KEY}` and `${json:exceptionRootCause:KEY}`.
//!
//! Keys: `className`, `message`, `stackTrace` (an array rendered through the
//! stack trace element template), and `stackTrace:text` (the conventional
//! multi-line text). Both stack trace keys write `null` while stack traces
//! are disabled.

use std::sync::Arc;

use jsonlayout_writer::JsonWriter;

use super::context::EventContext;
use super::frame::FrameResolver;
use super::write_text;
use crate::error::{RenderError, TemplateError};
use crate::event::LogEvent;
use crate::template::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExceptionField {
    ClassName,
    Message,
    StackTrace,
    StackTraceText,
}

#[derive(Debug, Clone)]
pub(crate) struct ExceptionResolver {
    root_cause: bool,
    field: ExceptionField,
    stack_traces: bool,
    exclude_empty: bool,
    frame_template: Arc<Template<FrameResolver>>,
}

impl ExceptionResolver {
    pub(crate) fn create(
        context: &EventContext,
        name: &'static str,
        root_cause: bool,
        key: Option<&str>,
    ) -> Result<Self, TemplateError> {
        let field = match key {
            Some("className") => ExceptionField::ClassName,
            Some("message") => ExceptionField::Message,
            Some("stackTrace") => ExceptionField::StackTrace,
            Some("stackTrace:text") => ExceptionField::StackTraceText,
            Some(other) => {
                return Err(TemplateError::UnknownKey {
                    resolver: name,
                    key: other.to_string(),
                })
            }
            None => return Err(TemplateError::MissingKey { resolver: name }),
        };
        Ok(Self {
            root_cause,
            field,
            stack_traces: context.stack_traces,
            exclude_empty: context.exclude_empty,
            frame_template: Arc::clone(&context.stack_trace_template),
        })
    }

    pub(crate) fn resolve(&self, event: &LogEvent, writer: &mut JsonWriter) -> Result<(), RenderError> {
        let is_stack_trace = matches!(
            self.field,
            ExceptionField::StackTrace | ExceptionField::StackTraceText
        );
        if is_stack_trace && !self.stack_traces {
            writer.write_null()?;
            return Ok(());
        }

        let Some(thrown) = event.thrown.as_deref() else {
            if self.field != ExceptionField::StackTrace {
                writer.write_null()?;
            }
            return Ok(());
        };
        let throwable = if self.root_cause {
            thrown.root_cause()?
        } else {
            thrown
        };

        match self.field {
            ExceptionField::ClassName => {
                write_text(writer, Some(throwable.class_name()), self.exclude_empty)?
            }
            ExceptionField::Message => write_text(writer, throwable.message(), self.exclude_empty)?,
            ExceptionField::StackTraceText => {
                writer.write_string_with(|out| throwable.write_stack_trace(out))?
            }
            ExceptionField::StackTrace => {
                let frames = throwable.stack_trace();
                if !frames.is_empty() {
                    writer.start_array()?;
                    for frame in frames {
                        self.frame_template.render(frame, writer)?;
                    }
                    writer.end_array()?;
                }
            }
        }
        Ok(())
    }
}

//! `${json:stackTraceElement:KEY}`: facts of a single stack frame.

use jsonlayout_writer::JsonWriter;
use once_cell::sync::Lazy;

use super::context::FrameContext;
use super::registry::ResolverRegistry;
use super::{write_text, TemplateResolver};
use crate::error::{RenderError, TemplateError};
use crate::event::StackFrame;

const NAME: &str = "stackTraceElement";

pub(crate) static FRAME_RESOLVERS: Lazy<ResolverRegistry<FrameContext, FrameResolver>> =
    Lazy::new(|| {
        ResolverRegistry::<FrameContext, FrameResolver>::new().register(NAME, FrameResolver::create)
    });

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameField {
    ClassName,
    MethodName,
    FileName,
    LineNumber,
}

#[derive(Debug, Clone)]
pub(crate) struct FrameResolver {
    field: FrameField,
    exclude_empty: bool,
}

impl FrameResolver {
    fn create(context: &FrameContext, key: Option<&str>) -> Result<Self, TemplateError> {
        let field = match key {
            Some("className") => FrameField::ClassName,
            Some("methodName") => FrameField::MethodName,
            Some("fileName") => FrameField::FileName,
            Some("lineNumber") => FrameField::LineNumber,
            Some(other) => {
                return Err(TemplateError::UnknownKey {
                    resolver: NAME,
                    key: other.to_string(),
                })
            }
            None => return Err(TemplateError::MissingKey { resolver: NAME }),
        };
        Ok(Self {
            field,
            exclude_empty: context.exclude_empty,
        })
    }
}

impl TemplateResolver<StackFrame> for FrameResolver {
    fn resolve(&self, frame: &StackFrame, writer: &mut JsonWriter) -> Result<(), RenderError> {
        match self.field {
            FrameField::ClassName => write_text(writer, Some(&frame.class_name), self.exclude_empty)?,
            FrameField::MethodName => {
                write_text(writer, Some(&frame.method_name), self.exclude_empty)?
            }
            FrameField::FileName => {
                write_text(writer, frame.file_name.as_deref(), self.exclude_empty)?
            }
            FrameField::LineNumber => writer.write_i32(frame.line_number)?,
        }
        Ok(())
    }
}

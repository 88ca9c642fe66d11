//! Error types for template compilation, rendering, and layout construction.
//!
//! Errors are split by when they can happen:
//!
//! - [`TemplateError`]: while compiling a template. Every directive name and
//!   key is validated here, so rendering never meets an unknown directive.
//! - [`RenderError`]: while rendering one event. Buffer overflow is the
//!   expected case; the pooled context is recycled before the error reaches
//!   the caller.
//! - [`LayoutError`]: while building a [`JsonLayout`](crate::JsonLayout) from
//!   its configuration.

use std::io;

use jsonlayout_writer::WriteError;
use thiserror::Error;

use crate::event::CausalLoop;

/// Compile-time template failures.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("unknown resolver: {name:?}")]
    UnknownResolver { name: String },

    #[error("unknown key {key:?} for resolver {resolver:?}")]
    UnknownKey { resolver: &'static str, key: String },

    #[error("resolver {resolver:?} requires a key")]
    MissingKey { resolver: &'static str },

    #[error("invalid key {key:?} for resolver {resolver:?}: {reason}")]
    InvalidKey {
        resolver: &'static str,
        key: String,
        reason: String,
    },

    #[error("additional fields require a JSON object at the template root")]
    RootNotObject,
}

/// Failures while rendering a single event.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The writer refused a token; overflow is the usual cause.
    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    CausalLoop(#[from] CausalLoop),

    #[error("destination error: {0}")]
    Destination(#[from] io::Error),
}

impl RenderError {
    /// True when the document did not fit into the output buffer.
    pub fn is_overflow(&self) -> bool {
        matches!(self, RenderError::Write(WriteError::Overflow { .. }))
    }
}

/// Which of the two templates of a layout failed to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Event,
    StackTraceElement,
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateKind::Event => f.write_str("event"),
            TemplateKind::StackTraceElement => f.write_str("stack trace element"),
        }
    }
}

/// Failures while building a layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid {kind} template: {source}")]
    Template {
        kind: TemplateKind,
        #[source]
        source: TemplateError,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

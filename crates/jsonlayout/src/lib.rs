//! # jsonlayout - Template-Driven JSON Log Layout
//!
//! `jsonlayout` renders structured log events as JSON documents shaped by a
//! user-supplied JSON *template*. String leaves of the template may be
//! directives such as `${json:message}` or `${json:exception:className}`;
//! each is bound to a resolver once, when the layout is built, and rendering
//! an event only walks the compiled tree and writes tokens.
//!
//! ## Core Concepts
//!
//! - [`JsonLayout`]: the compiled template plus a pool of serialization
//!   contexts; build it once, share it across threads
//! - [`LayoutConfig`]: every option, with serde support and `with_*` builders
//! - [`event::LogEvent`]: the event the resolvers read
//! - [`pool::ContextPool`]: reusable fixed-capacity buffers; overflow is a
//!   per-render error that never leaks into the next render
//! - [`bridge::JsonLogger`]: a `log` backend writing one document per record
//!
//! ## Quick Start
//!
//! ```rust
//! use jsonlayout::{JsonLayout, LayoutConfig};
//! use jsonlayout::event::{Level, LogEvent};
//!
//! let config = LayoutConfig::new().with_event_template(
//!     r#"{
//!         "level": "${json:level}",
//!         "message": "${json:message}",
//!         "user": "${json:mdc:user}",
//!         "service": "billing"
//!     }"#,
//! );
//! let layout = JsonLayout::new(config).unwrap();
//!
//! let event = LogEvent::new(Level::Info, "paid").with_context("user", "alice");
//! assert_eq!(
//!     layout.to_string(&event).unwrap(),
//!     r#"{"level":"INFO","message":"paid","user":"alice","service":"billing"}"#
//! );
//! ```
//!
//! ## Directives
//!
//! | Directive | Writes |
//! |-----------|--------|
//! | `${json:message}` / `${json:message:json}` | formatted text / structured message |
//! | `${json:level}` / `${json:level:severity}` / `${json:level:severity:code}` | level name / syslog severity |
//! | `${json:logger:name}` / `${json:logger:fqcn}` | logger names |
//! | `${json:timestamp}` / `${json:timestamp:epoch[:divisor=D[,integral]]}` | formatted or numeric time |
//! | `${json:thread:name}` / `:id` / `:priority` | thread facts |
//! | `${json:mdc}` / `${json:mdc:KEY}` | context map / one entry |
//! | `${json:ndc}` | context stack |
//! | `${json:marker:name}` | marker name |
//! | `${json:map:KEY}` | one field of a map message |
//! | `${json:main:KEY}` | a main argument |
//! | `${json:source:className}` / `:methodName` / `:fileName` / `:lineNumber` | source location |
//! | `${json:exception:KEY}` / `${json:exceptionRootCause:KEY}` | `className`, `message`, `stackTrace`, `stackTrace:text` |
//! | `${json:endOfBatch}` | batch flag |
//!
//! Any other string containing `${` goes through the layout's
//! [`substitutor::Substitutor`], e.g. `"${env:HOSTNAME:-localhost}"`.
//!
//! ## Null and absent values
//!
//! A scalar directive with nothing to report writes `null`; with
//! `exclude_empty_properties` on (the default), empty strings become `null`
//! too. Turning on `filter_nulls` leaves `null` fields and array elements
//! out of the document. The context map, the
//! context stack, and stack trace arrays leave their field out entirely when
//! empty. A document that resolves to nothing is written as `{}`.

pub mod bridge;
pub mod config;
pub mod destination;
mod error;
pub mod event;
mod layout;
pub mod pool;
mod resolver;
pub mod substitutor;
mod template;

pub use config::{AdditionalField, LayoutConfig};
pub use error::{LayoutError, RenderError, TemplateError, TemplateKind};
pub use layout::JsonLayout;
pub use pool::MetricsSnapshot;
pub use resolver::TimeZoneSpec;

pub use jsonlayout_writer::{JsonWriter, WriteError, WriterOptions};

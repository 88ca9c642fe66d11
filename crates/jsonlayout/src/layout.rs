//! The [`JsonLayout`] facade: a compiled event template plus a context pool.

use std::fmt;
use std::sync::Arc;

use jsonlayout_writer::WriterOptions;
use parking_lot::Mutex;

use crate::config::LayoutConfig;
use crate::destination::{write_through, ByteDestination};
use crate::error::{LayoutError, RenderError, TemplateKind};
use crate::event::LogEvent;
use crate::pool::{ContextPool, MetricsSnapshot, SerializationContext};
use crate::resolver::{EventContext, EventResolver};
use crate::substitutor::{LookupSubstitutor, MainArgs, Substitutor};
use crate::template::Template;

/// Renders [`LogEvent`]s as JSON documents shaped by a template.
///
/// A layout is immutable once built and can be shared across threads; each
/// render borrows a pooled serialization context for its duration.
///
/// ```rust
/// use jsonlayout::{JsonLayout, LayoutConfig};
/// use jsonlayout::event::{Level, LogEvent};
///
/// let config = LayoutConfig::new().with_event_template(r#"{"msg": "${json:message}"}"#);
/// let layout = JsonLayout::new(config).unwrap();
/// let json = layout.to_string(&LogEvent::new(Level::Info, "hello")).unwrap();
/// assert_eq!(json, r#"{"msg":"hello"}"#);
/// ```
pub struct JsonLayout {
    template: Template<EventResolver>,
    pool: ContextPool,
    config: LayoutConfig,
}

impl JsonLayout {
    /// Builds a layout using the default [`LookupSubstitutor`].
    pub fn new(config: LayoutConfig) -> Result<Self, LayoutError> {
        let main_args = Arc::new(MainArgs::new(config.main_args.iter().cloned()));
        let substitutor: Arc<dyn Substitutor> =
            Arc::new(LookupSubstitutor::new(Arc::clone(&main_args)));
        Self::build(config, main_args, substitutor)
    }

    /// Builds a layout whose non-directive `${...}` strings go through
    /// `substitutor`.
    pub fn with_substitutor(
        config: LayoutConfig,
        substitutor: Arc<dyn Substitutor>,
    ) -> Result<Self, LayoutError> {
        let main_args = Arc::new(MainArgs::new(config.main_args.iter().cloned()));
        Self::build(config, main_args, substitutor)
    }

    fn build(
        config: LayoutConfig,
        main_args: Arc<MainArgs>,
        substitutor: Arc<dyn Substitutor>,
    ) -> Result<Self, LayoutError> {
        if config.max_byte_count == 0 {
            return Err(LayoutError::InvalidConfig(
                "max_byte_count must be greater than zero".to_string(),
            ));
        }
        if config.pool_size == 0 {
            return Err(LayoutError::InvalidConfig(
                "pool_size must be greater than zero".to_string(),
            ));
        }

        let context = EventContext::new(&config, main_args, substitutor)?;
        let template = Template::compile(&context, &config.event_template, &config.additional_fields)
            .map_err(|source| LayoutError::Template {
                kind: TemplateKind::Event,
                source,
            })?;

        let options = WriterOptions {
            pretty: config.pretty_print,
            filter_nulls: config.filter_nulls,
            max_string_length: config.max_string_length,
            line_separator: config.line_separator.clone(),
        };
        let pool = ContextPool::new(config.pool_size, config.max_byte_count, options);
        log::debug!(
            "json layout ready: {} resolver(s), {} byte buffers, pool of {}",
            template.resolver_count(),
            config.max_byte_count,
            config.pool_size
        );

        Ok(Self {
            template,
            pool,
            config,
        })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    pub fn pool_metrics(&self) -> MetricsSnapshot {
        self.pool.metrics().snapshot()
    }

    /// Renders `event` and hands the encoded bytes to `f`.
    ///
    /// The bytes live in a pooled buffer and are only valid inside `f`.
    pub fn render_with<T>(
        &self,
        event: &LogEvent,
        f: impl FnOnce(&[u8]) -> T,
    ) -> Result<T, RenderError> {
        let mut context = self.pool.acquire();
        if let Err(err) = self.render_into(event, &mut context) {
            log::debug!("rendering failed, recycling its context: {}", err);
            return Err(err);
        }
        Ok(f(context.as_bytes()))
    }

    fn render_into(
        &self,
        event: &LogEvent,
        context: &mut SerializationContext,
    ) -> Result<(), RenderError> {
        let writer = context.writer_mut();
        self.template.render(event, writer)?;
        if writer.buffer().is_empty() {
            writer.start_object()?;
            writer.end_object()?;
        }
        Ok(())
    }

    pub fn to_bytes(&self, event: &LogEvent) -> Result<Vec<u8>, RenderError> {
        self.render_with(event, <[u8]>::to_vec)
    }

    pub fn to_string(&self, event: &LogEvent) -> Result<String, RenderError> {
        self.render_with(event, |bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Renders `event` into `destination`, draining it as often as the
    /// document needs. The lock is held only while copying.
    pub fn encode<D>(&self, event: &LogEvent, destination: &Mutex<D>) -> Result<(), RenderError>
    where
        D: ByteDestination + ?Sized,
    {
        self.render_with(event, |bytes| {
            let mut destination = destination.lock();
            write_through(&mut *destination, bytes)
        })?
        .map_err(RenderError::from)
    }
}

impl fmt::Debug for JsonLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLayout")
            .field("resolvers", &self.template.resolver_count())
            .field("pool_size", &self.pool.capacity())
            .field("max_byte_count", &self.pool.byte_capacity())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::BufferedDestination;
    use crate::event::Level;
    use serde_json::{json, Value};

    fn layout(template: &str) -> JsonLayout {
        JsonLayout::new(LayoutConfig::new().with_event_template(template).with_pool_size(2)).unwrap()
    }

    #[test]
    fn test_hello_example() {
        let layout = layout(r#"{"msg": "${json:message}"}"#);
        let event = LogEvent::new(Level::Info, "hello");
        assert_eq!(layout.to_string(&event).unwrap(), r#"{"msg":"hello"}"#);
        assert_eq!(layout.to_bytes(&event).unwrap(), br#"{"msg":"hello"}"#.to_vec());
    }

    #[test]
    fn test_empty_document_renders_as_empty_object() {
        let layout = layout(r#""${json:mdc}""#);
        let event = LogEvent::new(Level::Info, "m");
        assert_eq!(layout.to_string(&event).unwrap(), "{}");
    }

    #[test]
    fn test_invalid_sizes_are_rejected() {
        let zero_bytes = LayoutConfig::new().with_max_byte_count(0);
        assert!(matches!(
            JsonLayout::new(zero_bytes),
            Err(LayoutError::InvalidConfig(_))
        ));
        let zero_pool = LayoutConfig::new().with_pool_size(0);
        assert!(matches!(
            JsonLayout::new(zero_pool),
            Err(LayoutError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_bad_event_template_is_tagged() {
        let config = LayoutConfig::new().with_event_template(r#"{"x": "${json:nope}"}"#);
        assert!(matches!(
            JsonLayout::new(config),
            Err(LayoutError::Template {
                kind: TemplateKind::Event,
                source: crate::error::TemplateError::UnknownResolver { .. },
            })
        ));
    }

    #[test]
    fn test_default_template_renders() {
        let layout = JsonLayout::new(LayoutConfig::new().with_pool_size(1)).unwrap();
        let event = LogEvent::new(Level::Error, "boom").with_logger("app");
        let value: Value = serde_json::from_slice(&layout.to_bytes(&event).unwrap()).unwrap();
        assert_eq!(value["message"], "boom");
        assert_eq!(value["level"], "ERROR");
        assert_eq!(value["logger_name"], "app");
        assert_eq!(value["@version"], 1);
        assert!(value.get("exception").map_or(true, Value::is_object));
    }

    #[test]
    fn test_encode_drains_small_destination() {
        let layout = layout(r#"{"msg": "${json:message}"}"#);
        let destination = Mutex::new(BufferedDestination::new(Vec::new(), 5));
        layout
            .encode(&LogEvent::new(Level::Info, "hello"), &destination)
            .unwrap();
        let bytes = destination.into_inner().into_inner().unwrap();
        assert_eq!(bytes, br#"{"msg":"hello"}"#.to_vec());
    }

    #[test]
    fn test_render_with_sees_pooled_bytes() {
        let layout = layout(r#"["${json:level}"]"#);
        let len = layout
            .render_with(&LogEvent::new(Level::Debug, "m"), |bytes| bytes.len())
            .unwrap();
        assert_eq!(len, r#"["DEBUG"]"#.len());
        assert_eq!(layout.pool_metrics().returns, 1);
        assert_eq!(json!(["DEBUG"]).to_string().len(), len);
    }
}

//! Compile contexts: the configuration resolvers are built against.

use std::sync::Arc;

use regex::Regex;

use super::event::{EventResolver, SubstitutionResolver, EVENT_RESOLVERS};
use super::frame::{FrameResolver, FRAME_RESOLVERS};
use super::registry::ResolverRegistry;
use super::timestamp::{TimeZoneSpec, TimestampFormat};
use crate::config::LayoutConfig;
use crate::error::{LayoutError, TemplateKind};
use crate::substitutor::{MainArgs, Substitutor};
use crate::template::{CompileContext, Node, Template};

/// Everything event resolvers may capture at compile time.
pub(crate) struct EventContext {
    pub(crate) location_info: bool,
    pub(crate) stack_traces: bool,
    pub(crate) exclude_empty: bool,
    pub(crate) mdc_key_pattern: Option<Regex>,
    pub(crate) ndc_pattern: Option<Regex>,
    pub(crate) timestamp_format: Arc<TimestampFormat>,
    pub(crate) main_args: Arc<MainArgs>,
    pub(crate) substitutor: Arc<dyn Substitutor>,
    pub(crate) stack_trace_template: Arc<Template<FrameResolver>>,
}

impl EventContext {
    /// Validates `config` and compiles the stack trace element template.
    pub(crate) fn new(
        config: &LayoutConfig,
        main_args: Arc<MainArgs>,
        substitutor: Arc<dyn Substitutor>,
    ) -> Result<Self, LayoutError> {
        let zone: TimeZoneSpec = config
            .time_zone
            .parse()
            .map_err(LayoutError::InvalidConfig)?;
        let timestamp_format = TimestampFormat::new(&config.timestamp_pattern, zone)
            .map_err(LayoutError::InvalidConfig)?;

        let frame_context = FrameContext {
            exclude_empty: config.exclude_empty_properties,
            substitutor: Arc::clone(&substitutor),
        };
        let stack_trace_template =
            Template::compile(&frame_context, &config.stack_trace_element_template, &[]).map_err(
                |source| LayoutError::Template {
                    kind: TemplateKind::StackTraceElement,
                    source,
                },
            )?;

        Ok(Self {
            location_info: config.location_info,
            stack_traces: config.stack_traces,
            exclude_empty: config.exclude_empty_properties,
            mdc_key_pattern: full_match("mdc_key_pattern", config.mdc_key_pattern.as_deref())?,
            ndc_pattern: full_match("ndc_pattern", config.ndc_pattern.as_deref())?,
            timestamp_format: Arc::new(timestamp_format),
            main_args,
            substitutor,
            stack_trace_template: Arc::new(stack_trace_template),
        })
    }
}

/// Compiles `pattern` so that it must match a whole key.
fn full_match(option: &str, pattern: Option<&str>) -> Result<Option<Regex>, LayoutError> {
    pattern
        .map(|pattern| {
            Regex::new(&format!("^(?:{})$", pattern))
                .map_err(|err| LayoutError::InvalidConfig(format!("{}: {}", option, err)))
        })
        .transpose()
}

impl CompileContext for EventContext {
    type Resolver = EventResolver;

    fn registry(&self) -> &ResolverRegistry<Self, EventResolver> {
        &EVENT_RESOLVERS
    }

    fn exclude_empty(&self) -> bool {
        self.exclude_empty
    }

    fn compile_substitution(&self, text: &str) -> Node<EventResolver> {
        Node::Resolver(EventResolver::Substitution(SubstitutionResolver {
            text: text.into(),
            substitutor: Arc::clone(&self.substitutor),
            exclude_empty: self.exclude_empty,
        }))
    }
}

/// Stack trace element templates have no event to look at, so their
/// substitutions run once, at compile time.
pub(crate) struct FrameContext {
    pub(crate) exclude_empty: bool,
    pub(crate) substitutor: Arc<dyn Substitutor>,
}

impl CompileContext for FrameContext {
    type Resolver = FrameResolver;

    fn registry(&self) -> &ResolverRegistry<Self, FrameResolver> {
        &FRAME_RESOLVERS
    }

    fn exclude_empty(&self) -> bool {
        self.exclude_empty
    }

    fn compile_substitution(&self, text: &str) -> Node<FrameResolver> {
        let replaced = self.substitutor.substitute(text, None);
        if replaced.is_empty() && self.exclude_empty {
            Node::Null
        } else {
            Node::Text(replaced.as_ref().into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substitutor::LookupSubstitutor;

    fn context(config: &LayoutConfig) -> Result<EventContext, LayoutError> {
        let main_args = Arc::new(MainArgs::new(config.main_args.iter().cloned()));
        let substitutor = Arc::new(LookupSubstitutor::new(Arc::clone(&main_args)));
        EventContext::new(config, main_args, substitutor)
    }

    #[test]
    fn test_default_config_builds() {
        let context = context(&LayoutConfig::default()).unwrap();
        assert!(context.exclude_empty);
        assert!(context.mdc_key_pattern.is_none());
        assert_eq!(context.stack_trace_template.resolver_count(), 4);
    }

    #[test]
    fn test_patterns_match_whole_keys() {
        let config = LayoutConfig::new().with_mdc_key_pattern("user|session");
        let context = context(&config).unwrap();
        let pattern = context.mdc_key_pattern.unwrap();
        assert!(pattern.is_match("user"));
        assert!(pattern.is_match("session"));
        assert!(!pattern.is_match("username"));
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let bad_regex = LayoutConfig::new().with_ndc_pattern("(");
        assert!(matches!(context(&bad_regex), Err(LayoutError::InvalidConfig(_))));

        let bad_zone = LayoutConfig::new().with_time_zone("Atlantis");
        assert!(matches!(context(&bad_zone), Err(LayoutError::InvalidConfig(_))));

        let bad_frame = LayoutConfig::new()
            .with_stack_trace_element_template(r#"{"c": "${json:stackTraceElement:color}"}"#);
        assert!(matches!(
            context(&bad_frame),
            Err(LayoutError::Template {
                kind: TemplateKind::StackTraceElement,
                ..
            })
        ));
    }

    #[test]
    fn test_frame_substitution_happens_at_compile_time() {
        let config = LayoutConfig::new().with_main_args(["--app", "demo"]);
        let frame_context = FrameContext {
            exclude_empty: true,
            substitutor: Arc::new(LookupSubstitutor::new(Arc::new(MainArgs::new(
                config.main_args.iter().cloned(),
            )))),
        };
        assert!(matches!(
            frame_context.compile_substitution("${main:--app}"),
            Node::Text(text) if &*text == "demo"
        ));
        assert!(matches!(
            frame_context.compile_substitution("${main:--none:-}"),
            Node::Null
        ));
    }
}

//! Layout configuration.
//!
//! [`LayoutConfig`] is a plain serde-friendly struct: embedders build it in
//! code with the chained `with_*` methods, or deserialize it from whatever
//! format they already use. Missing fields take their defaults.
//!
//! ```rust
//! use jsonlayout::LayoutConfig;
//!
//! let config = LayoutConfig::new()
//!     .with_event_template(r#"{"msg": "${json:message}"}"#)
//!     .with_pretty_print(true)
//!     .with_additional_field("service", "billing");
//!
//! assert!(config.exclude_empty_properties);
//! assert_eq!(config.max_byte_count, 16 * 1024);
//! ```
//!
//! Validation happens in [`JsonLayout::new`](crate::JsonLayout::new), which
//! rejects any configuration it cannot fully honor.

use serde::{Deserialize, Serialize};

/// The built-in Logstash-style event template.
pub const DEFAULT_EVENT_TEMPLATE: &str = include_str!("../templates/logstash_event.json");

/// The built-in template for one stack trace element.
pub const DEFAULT_STACK_TRACE_ELEMENT_TEMPLATE: &str =
    include_str!("../templates/stack_trace_element.json");

/// ISO-8601 with milliseconds and a `+00:00` style offset.
pub const DEFAULT_TIMESTAMP_PATTERN: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

pub const DEFAULT_MAX_BYTE_COUNT: usize = 16 * 1024;

/// A static field appended to the root object of the event template.
///
/// The value is compiled like any template string, so it may be a directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalField {
    pub key: String,
    pub value: String,
}

/// Every option a [`JsonLayout`](crate::JsonLayout) recognizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Indented output, with [`line_separator`](Self::line_separator) after
    /// each document.
    pub pretty_print: bool,
    /// Lets `source` directives report the event's source location.
    pub location_info: bool,
    /// Lets `stackTrace` directives report exception stack traces.
    pub stack_traces: bool,
    /// Write empty strings as `null`.
    pub exclude_empty_properties: bool,
    /// Drop object fields and array elements whose value is `null`.
    pub filter_nulls: bool,
    /// `chrono` strftime pattern used by `${json:timestamp}`.
    pub timestamp_pattern: String,
    /// `UTC`, `local`, or a fixed offset such as `+05:30`.
    pub time_zone: String,
    /// Only MDC keys fully matching this regex are rendered by `${json:mdc}`.
    pub mdc_key_pattern: Option<String>,
    /// Only NDC items fully matching this regex are rendered by `${json:ndc}`.
    pub ndc_pattern: Option<String>,
    pub event_template: String,
    pub stack_trace_element_template: String,
    pub additional_fields: Vec<AdditionalField>,
    pub line_separator: String,
    /// Capacity of each pooled output buffer.
    pub max_byte_count: usize,
    /// Truncate strings and field names to this many characters; 0 disables.
    pub max_string_length: usize,
    /// Serialization contexts kept for reuse.
    pub pool_size: usize,
    /// Arguments served by `${json:main:KEY}` and `${main:KEY}`.
    pub main_args: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            pretty_print: false,
            location_info: false,
            stack_traces: true,
            exclude_empty_properties: true,
            filter_nulls: false,
            timestamp_pattern: DEFAULT_TIMESTAMP_PATTERN.to_string(),
            time_zone: "UTC".to_string(),
            mdc_key_pattern: None,
            ndc_pattern: None,
            event_template: DEFAULT_EVENT_TEMPLATE.to_string(),
            stack_trace_element_template: DEFAULT_STACK_TRACE_ELEMENT_TEMPLATE.to_string(),
            additional_fields: Vec::new(),
            line_separator: "\n".to_string(),
            max_byte_count: DEFAULT_MAX_BYTE_COUNT,
            max_string_length: 0,
            pool_size: default_pool_size(),
            main_args: Vec::new(),
        }
    }
}

fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 4)
        .unwrap_or(4)
        .max(1)
}

impl LayoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pretty_print(mut self, enabled: bool) -> Self {
        self.pretty_print = enabled;
        self
    }

    pub fn with_location_info(mut self, enabled: bool) -> Self {
        self.location_info = enabled;
        self
    }

    pub fn with_stack_traces(mut self, enabled: bool) -> Self {
        self.stack_traces = enabled;
        self
    }

    pub fn with_exclude_empty_properties(mut self, enabled: bool) -> Self {
        self.exclude_empty_properties = enabled;
        self
    }

    pub fn with_filter_nulls(mut self, enabled: bool) -> Self {
        self.filter_nulls = enabled;
        self
    }

    pub fn with_timestamp_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.timestamp_pattern = pattern.into();
        self
    }

    pub fn with_time_zone(mut self, zone: impl Into<String>) -> Self {
        self.time_zone = zone.into();
        self
    }

    pub fn with_mdc_key_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.mdc_key_pattern = Some(pattern.into());
        self
    }

    pub fn with_ndc_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.ndc_pattern = Some(pattern.into());
        self
    }

    pub fn with_event_template(mut self, template: impl Into<String>) -> Self {
        self.event_template = template.into();
        self
    }

    pub fn with_stack_trace_element_template(mut self, template: impl Into<String>) -> Self {
        self.stack_trace_element_template = template.into();
        self
    }

    pub fn with_additional_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_fields.push(AdditionalField {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_line_separator(mut self, separator: impl Into<String>) -> Self {
        self.line_separator = separator.into();
        self
    }

    pub fn with_max_byte_count(mut self, bytes: usize) -> Self {
        self.max_byte_count = bytes;
        self
    }

    pub fn with_max_string_length(mut self, chars: usize) -> Self {
        self.max_string_length = chars;
        self
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn with_main_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.main_args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LayoutConfig::default();
        assert!(!config.pretty_print);
        assert!(!config.location_info);
        assert!(config.stack_traces);
        assert!(config.exclude_empty_properties);
        assert!(!config.filter_nulls);
        assert_eq!(config.time_zone, "UTC");
        assert_eq!(config.line_separator, "\n");
        assert!(config.pool_size >= 1);
    }

    #[test]
    fn test_builtin_templates_are_valid_json() {
        serde_json::from_str::<serde_json::Value>(DEFAULT_EVENT_TEMPLATE).unwrap();
        serde_json::from_str::<serde_json::Value>(DEFAULT_STACK_TRACE_ELEMENT_TEMPLATE).unwrap();
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: LayoutConfig = serde_json::from_str(
            r#"{
                "pretty_print": true,
                "additional_fields": [{"key": "app", "value": "demo"}],
                "main_args": ["--env", "test"]
            }"#,
        )
        .unwrap();
        assert!(config.pretty_print);
        assert_eq!(config.additional_fields[0].key, "app");
        assert_eq!(config.main_args.len(), 2);
        assert_eq!(config.max_byte_count, DEFAULT_MAX_BYTE_COUNT);
        assert_eq!(config.event_template, DEFAULT_EVENT_TEMPLATE);
    }

    #[test]
    fn test_builder_chain() {
        let config = LayoutConfig::new()
            .with_location_info(true)
            .with_mdc_key_pattern("user.*")
            .with_additional_field("a", "1")
            .with_additional_field("b", "${json:level}")
            .with_pool_size(2);
        assert!(config.location_info);
        assert_eq!(config.mdc_key_pattern.as_deref(), Some("user.*"));
        assert_eq!(config.additional_fields.len(), 2);
        assert_eq!(config.pool_size, 2);
    }
}

//! Property substitution for template strings that are not directives.
//!
//! A template string like `"${env:HOSTNAME:-unknown}"` is not a `${json:...}`
//! directive. It is handed to a [`Substitutor`] instead, once per event for
//! event templates and once at compile time for stack trace element
//! templates (where no event exists).
//!
//! The default [`LookupSubstitutor`] understands these lookups, each with an
//! optional `:-default`:
//!
//! | Lookup | Source |
//! |--------|--------|
//! | `${ctx:KEY}` | the event's context map (MDC) |
//! | `${map:KEY}` | a field of a map message |
//! | `${env:NAME}` | a process environment variable |
//! | `${main:KEY}` | the configured main arguments ([`MainArgs`]) |
//!
//! Anything it cannot resolve, and has no default for, is left verbatim.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::event::{LogEvent, Message};

/// Replaces `${...}` lookups in template strings.
pub trait Substitutor: Send + Sync {
    /// Returns `text` with every lookup it recognizes replaced.
    ///
    /// `event` is `None` when substituting at compile time.
    fn substitute<'a>(&self, text: &'a str, event: Option<&LogEvent>) -> Cow<'a, str>;
}

/// Program arguments addressable by position or by flag.
///
/// Each argument is reachable by its zero-based index, and each argument is
/// also a key for the argument that follows it, so `--port 8080` makes
/// `"--port"` resolve to `"8080"`.
///
/// ```rust
/// use jsonlayout::substitutor::MainArgs;
///
/// let args = MainArgs::new(["--env", "prod", "-v"]);
/// assert_eq!(args.get("0"), Some("--env"));
/// assert_eq!(args.get("--env"), Some("prod"));
/// assert_eq!(args.get("-v"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MainArgs {
    lookup: HashMap<String, String>,
}

impl MainArgs {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let mut lookup = HashMap::with_capacity(args.len() * 2);
        for (index, arg) in args.iter().enumerate() {
            lookup.insert(index.to_string(), arg.clone());
        }
        for pair in args.windows(2) {
            lookup.entry(pair[0].clone()).or_insert_with(|| pair[1].clone());
        }
        Self { lookup }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lookup.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

/// The default substitutor; see the [module docs](self) for its lookups.
#[derive(Debug, Clone, Default)]
pub struct LookupSubstitutor {
    main_args: Arc<MainArgs>,
}

impl LookupSubstitutor {
    pub fn new(main_args: Arc<MainArgs>) -> Self {
        Self { main_args }
    }

    fn lookup(&self, prefix: &str, key: &str, event: Option<&LogEvent>) -> Option<String> {
        match prefix {
            "ctx" => event
                .and_then(|event| event.context_data.get(key))
                .map(value_text),
            "map" => match event.map(|event| &event.message) {
                Some(Message::Map(map)) => map.get(key).map(value_text),
                _ => None,
            },
            "env" => std::env::var(key).ok(),
            "main" => self.main_args.get(key).map(str::to_string),
            _ => None,
        }
    }
}

impl Substitutor for LookupSubstitutor {
    fn substitute<'a>(&self, text: &'a str, event: Option<&LogEvent>) -> Cow<'a, str> {
        if !text.contains("${") {
            return Cow::Borrowed(text);
        }

        let mut output = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                // unterminated, keep the tail as is
                output.push_str(&rest[start..]);
                rest = "";
                break;
            };
            // the default separator is searched after the prefix, so keys
            // such as `--flag` survive
            let (resolved, default) = match after[..end].split_once(':') {
                Some((prefix, tail)) => {
                    let (key, default) = match tail.split_once(":-") {
                        Some((key, default)) => (key, Some(default)),
                        None => (tail, None),
                    };
                    (self.lookup(prefix, key, event), default)
                }
                None => (None, None),
            };
            match (resolved, default) {
                (Some(value), _) => output.push_str(&value),
                (None, Some(default)) => output.push_str(default),
                (None, None) => output.push_str(&rest[start..start + 2 + end + 1]),
            }
            rest = &after[end + 1..];
        }
        output.push_str(rest);
        Cow::Owned(output)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Level;
    use indexmap::IndexMap;
    use serde_json::json;

    fn substitutor() -> LookupSubstitutor {
        LookupSubstitutor::new(Arc::new(MainArgs::new(["--region", "eu-1"])))
    }

    #[test]
    fn test_plain_text_is_borrowed() {
        let result = substitutor().substitute("no lookups here", None);
        assert!(matches!(result, Cow::Borrowed("no lookups here")));
    }

    #[test]
    fn test_context_lookup() {
        let event = LogEvent::new(Level::Info, "m")
            .with_context("user", "alice")
            .with_context("count", 3);
        let s = substitutor();
        assert_eq!(s.substitute("u=${ctx:user}", Some(&event)), "u=alice");
        assert_eq!(s.substitute("${ctx:count}", Some(&event)), "3");
    }

    #[test]
    fn test_map_lookup_requires_map_message() {
        let mut map = IndexMap::new();
        map.insert("id".to_string(), json!("42"));
        let event = LogEvent::new(Level::Info, Message::Map(map));
        let s = substitutor();
        assert_eq!(s.substitute("${map:id}", Some(&event)), "42");

        let text_event = LogEvent::new(Level::Info, "plain");
        assert_eq!(s.substitute("${map:id}", Some(&text_event)), "${map:id}");
    }

    #[test]
    fn test_main_lookup_and_defaults() {
        let s = substitutor();
        assert_eq!(s.substitute("${main:--region}", None), "eu-1");
        assert_eq!(s.substitute("${main:1}", None), "eu-1");
        assert_eq!(s.substitute("${main:--zone:-none}", None), "none");
    }

    #[test]
    fn test_unresolved_lookups_stay_verbatim() {
        let s = substitutor();
        assert_eq!(s.substitute("a ${ctx:missing} b", None), "a ${ctx:missing} b");
        assert_eq!(s.substitute("${unknown:x}", None), "${unknown:x}");
        assert_eq!(s.substitute("tail ${open", None), "tail ${open");
    }

    #[test]
    fn test_env_lookup_default() {
        let s = substitutor();
        assert_eq!(
            s.substitute("${env:JSONLAYOUT_SURELY_UNSET_VARIABLE:-fallback}", None),
            "fallback"
        );
    }

    #[test]
    fn test_main_args_first_flag_wins() {
        let args = MainArgs::new(["-x", "1", "-x", "2"]);
        assert_eq!(args.get("-x"), Some("1"));
        assert_eq!(args.get("3"), Some("2"));
        assert!(MainArgs::default().is_empty());
    }
}

//! Directive syntax: `${json:NAME}` and `${json:NAME:KEY}`.

const PREFIX: &str = "${json:";
const SUFFIX: &str = "}";

/// A parsed directive. `name` selects the resolver, `key` configures it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Directive<'a> {
    pub name: &'a str,
    pub key: Option<&'a str>,
}

impl<'a> Directive<'a> {
    /// Parses a whole template string as a directive.
    ///
    /// The name runs to the first `:` after the prefix; the key is everything
    /// after it up to the closing brace, colons included. Strings that do not
    /// start with `${json:` and end with `}` are not directives.
    pub(crate) fn parse(text: &'a str) -> Option<Self> {
        let body = text.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
        Some(match body.split_once(':') {
            Some((name, key)) => Directive {
                name,
                key: Some(key),
            },
            None => Directive {
                name: body,
                key: None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_only() {
        assert_eq!(
            Directive::parse("${json:message}"),
            Some(Directive {
                name: "message",
                key: None
            })
        );
    }

    #[test]
    fn test_key_keeps_inner_colons() {
        let directive = Directive::parse("${json:exception:stackTrace:text}").unwrap();
        assert_eq!(directive.name, "exception");
        assert_eq!(directive.key, Some("stackTrace:text"));
    }

    #[test]
    fn test_key_may_contain_braces_and_commas() {
        let directive = Directive::parse("${json:timestamp:epoch:divisor=1e6,integral}").unwrap();
        assert_eq!(directive.name, "timestamp");
        assert_eq!(directive.key, Some("epoch:divisor=1e6,integral"));
    }

    #[test]
    fn test_non_directives() {
        assert_eq!(Directive::parse("message"), None);
        assert_eq!(Directive::parse("${ctx:user}"), None);
        assert_eq!(Directive::parse("${json:message} trailing"), None);
        assert_eq!(Directive::parse("prefix ${json:message}"), None);
    }

    #[test]
    fn test_empty_name_is_still_a_directive() {
        // rejected later as an unknown resolver
        assert_eq!(
            Directive::parse("${json:}"),
            Some(Directive { name: "", key: None })
        );
    }
}

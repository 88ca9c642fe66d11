use serde_json::Value;

use super::{CompileContext, Directive, Node};
use crate::error::TemplateError;

/// Compiles one template value, recursing through objects and arrays.
pub(super) fn compile<C: CompileContext>(
    context: &C,
    value: &Value,
) -> Result<Node<C::Resolver>, TemplateError> {
    match value {
        Value::Object(map) if map.is_empty() => Ok(Node::EmptyObject),
        Value::Object(map) => {
            let mut fields = Vec::with_capacity(map.len());
            for (name, child) in map {
                fields.push((name.as_str().into(), compile(context, child)?));
            }
            Ok(Node::Object(fields))
        }
        Value::Array(items) if items.is_empty() => Ok(Node::EmptyArray),
        Value::Array(items) => items
            .iter()
            .map(|item| compile(context, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Node::Array),
        Value::String(text) => compile_string(context, text),
        Value::Null => Ok(Node::Null),
        scalar => Ok(Node::Constant(scalar.clone())),
    }
}

/// Compiles a template string: directive, then substitution, then literal.
pub(super) fn compile_string<C: CompileContext>(
    context: &C,
    text: &str,
) -> Result<Node<C::Resolver>, TemplateError> {
    if let Some(directive) = Directive::parse(text) {
        return context
            .registry()
            .create(context, directive.name, directive.key)
            .map(Node::Resolver);
    }
    if text.contains("${") {
        return Ok(context.compile_substitution(text));
    }
    if text.is_empty() && context.exclude_empty() {
        Ok(Node::Null)
    } else {
        Ok(Node::Text(text.into()))
    }
}

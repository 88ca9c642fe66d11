//! Template compilation and rendering.
//!
//! A template is a JSON document whose string leaves may be directives. It is
//! compiled once into a [`Template`]: a tree of [`Node`]s mirroring the
//! document, with each directive replaced by a bound resolver. Rendering walks
//! that tree and calls the writer directly; no JSON is parsed per event.
//!
//! # Compilation rules
//!
//! | Template value | Compiled node |
//! |----------------|---------------|
//! | `{}` / `[]` | [`Node::EmptyObject`] / [`Node::EmptyArray`] |
//! | object / array | [`Node::Object`] / [`Node::Array`], order preserved |
//! | `"${json:NAME[:KEY]}"` | [`Node::Resolver`] from the context's registry |
//! | other string containing `${` | context-defined substitution |
//! | `""` with empty-property exclusion | [`Node::Null`] |
//! | other string | [`Node::Text`] |
//! | `null` | [`Node::Null`] |
//! | number / boolean | [`Node::Constant`] |
//!
//! Object and array nodes always write their brackets, so a node whose
//! children all resolve to nothing renders as `{}` or `[]`.

mod compiler;
mod directive;
mod renderer;

use jsonlayout_writer::JsonWriter;
use serde_json::Value;

use crate::config::AdditionalField;
use crate::error::{RenderError, TemplateError};
use crate::resolver::{ResolverRegistry, TemplateResolver};

pub(crate) use directive::Directive;

/// What a compilation needs from its surroundings.
pub(crate) trait CompileContext: Sized {
    type Resolver;

    fn registry(&self) -> &ResolverRegistry<Self, Self::Resolver>;

    fn exclude_empty(&self) -> bool;

    /// Compiles a non-directive string that contains `${`.
    fn compile_substitution(&self, text: &str) -> Node<Self::Resolver>;
}

/// One node of a compiled template.
#[derive(Debug)]
pub(crate) enum Node<R> {
    Object(Vec<(Box<str>, Node<R>)>),
    Array(Vec<Node<R>>),
    EmptyObject,
    EmptyArray,
    Constant(Value),
    Text(Box<str>),
    Null,
    Resolver(R),
}

impl<R> Node<R> {
    fn resolver_count(&self) -> usize {
        match self {
            Node::Object(fields) => fields.iter().map(|(_, node)| node.resolver_count()).sum(),
            Node::Array(items) => items.iter().map(Node::resolver_count).sum(),
            Node::Resolver(_) => 1,
            _ => 0,
        }
    }
}

/// A compiled, immutable template.
#[derive(Debug)]
pub(crate) struct Template<R> {
    root: Node<R>,
}

impl<R> Template<R> {
    /// Parses `source` and compiles it against `context`.
    ///
    /// `additional_fields` are compiled as template strings and appended to
    /// the root object, replacing a field of the same name; they require the
    /// root to be an object.
    pub(crate) fn compile<C>(
        context: &C,
        source: &str,
        additional_fields: &[AdditionalField],
    ) -> Result<Self, TemplateError>
    where
        C: CompileContext<Resolver = R>,
    {
        let document: Value = serde_json::from_str(source)?;
        let mut root = compiler::compile(context, &document)?;

        if !additional_fields.is_empty() {
            let mut fields = match root {
                Node::Object(fields) => fields,
                Node::EmptyObject => Vec::new(),
                _ => return Err(TemplateError::RootNotObject),
            };
            for field in additional_fields {
                let node = compiler::compile_string(context, &field.value)?;
                match fields.iter_mut().find(|(name, _)| **name == *field.key) {
                    Some(slot) => slot.1 = node,
                    None => fields.push((field.key.as_str().into(), node)),
                }
            }
            root = Node::Object(fields);
        }

        let template = Self { root };
        log::debug!(
            "compiled template with {} resolver(s)",
            template.resolver_count()
        );
        Ok(template)
    }

    pub(crate) fn resolver_count(&self) -> usize {
        self.root.resolver_count()
    }

    /// Writes `subject` through this template.
    ///
    /// If the root resolves to nothing, nothing is written.
    pub(crate) fn render<S: ?Sized>(
        &self,
        subject: &S,
        writer: &mut JsonWriter,
    ) -> Result<(), RenderError>
    where
        R: TemplateResolver<S>,
    {
        renderer::render_node(&self.root, subject, writer)
    }
}

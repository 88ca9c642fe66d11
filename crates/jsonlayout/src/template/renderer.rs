use jsonlayout_writer::JsonWriter;

use super::Node;
use crate::error::RenderError;
use crate::resolver::TemplateResolver;

/// Writes `node` for `subject`.
///
/// Field names are written before their value and discarded afterwards, so a
/// resolver that writes nothing leaves no trace of its field.
pub(super) fn render_node<S, R>(
    node: &Node<R>,
    subject: &S,
    writer: &mut JsonWriter,
) -> Result<(), RenderError>
where
    S: ?Sized,
    R: TemplateResolver<S>,
{
    match node {
        Node::Object(fields) => {
            writer.start_object()?;
            for (name, child) in fields {
                writer.write_field_name(name)?;
                render_node(child, subject, writer)?;
                writer.discard_field_name();
            }
            writer.end_object()?;
        }
        Node::Array(items) => {
            writer.start_array()?;
            for item in items {
                render_node(item, subject, writer)?;
            }
            writer.end_array()?;
        }
        Node::EmptyObject => {
            writer.start_object()?;
            writer.end_object()?;
        }
        Node::EmptyArray => {
            writer.start_array()?;
            writer.end_array()?;
        }
        Node::Constant(value) => writer.write_value(value)?,
        Node::Text(text) => writer.write_string(text)?,
        Node::Null => writer.write_null()?,
        Node::Resolver(resolver) => resolver.resolve(subject, writer)?,
    }
    Ok(())
}

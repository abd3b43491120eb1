use crate::{error::SchemaError, particle::MaxOccurs, xstypes::QName, XS_NAMESPACE};
use roxmltree::Node;

/// Conversion of an attribute's normalized value into the property value it maps to.
pub(crate) trait ActualValue<'a>: Sized {
    /// `Ok(None)` when `src` is outside the lexical space of the property.
    fn convert(src: &'a str, parent: Node) -> Result<Option<Self>, SchemaError>;
}

impl<'a> ActualValue<'a> for &'a str {
    fn convert(src: &'a str, _parent: Node) -> Result<Option<Self>, SchemaError> {
        Ok(Some(src))
    }
}

impl ActualValue<'_> for String {
    fn convert(src: &str, _parent: Node) -> Result<Option<Self>, SchemaError> {
        Ok(Some(src.to_string()))
    }
}

impl ActualValue<'_> for QName {
    fn convert(src: &str, parent: Node) -> Result<Option<Self>, SchemaError> {
        QName::parse(src, parent).map(Some)
    }
}

impl<'a, T: ActualValue<'a>> ActualValue<'a> for Vec<T> {
    fn convert(src: &'a str, parent: Node) -> Result<Option<Self>, SchemaError> {
        // NOTE: This assumes a list with whiteSpace="collapse"
        src.split_ascii_whitespace()
            .map(|item| T::convert(item, parent))
            .collect::<Result<Option<Vec<_>>, _>>()
    }
}

impl ActualValue<'_> for bool {
    fn convert(src: &str, _parent: Node) -> Result<Option<Self>, SchemaError> {
        Ok(match src.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        })
    }
}

impl ActualValue<'_> for u64 {
    fn convert(src: &str, _parent: Node) -> Result<Option<Self>, SchemaError> {
        Ok(src.trim().parse().ok())
    }
}

impl ActualValue<'_> for MaxOccurs {
    fn convert(src: &str, _parent: Node) -> Result<Option<Self>, SchemaError> {
        Ok(match src.trim() {
            "unbounded" => Some(MaxOccurs::Unbounded),
            count => count.parse().ok().map(MaxOccurs::Count),
        })
    }
}

/// The converted value of `attribute` on `node`, `None` if the attribute is absent.
pub(crate) fn actual_value<'a, T: ActualValue<'a>>(
    node: Node<'a, '_>,
    attribute: &'static str,
) -> Result<Option<T>, SchemaError> {
    let Some(src) = node.attribute(attribute) else {
        return Ok(None);
    };
    match T::convert(src, node)? {
        Some(value) => Ok(Some(value)),
        None => Err(SchemaError::InvalidAttribute {
            element: node.tag_name().name().to_string(),
            attribute,
            value: src.to_string(),
        }),
    }
}

pub(crate) fn required_value<'a, T: ActualValue<'a>>(
    node: Node<'a, '_>,
    attribute: &'static str,
) -> Result<T, SchemaError> {
    actual_value(node, attribute)?.ok_or_else(|| SchemaError::MissingAttribute {
        element: node.tag_name().name().to_string(),
        attribute,
    })
}

/// Element children in the XSD namespace, annotations excluded.
pub(crate) fn schema_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|c| {
        c.is_element()
            && c.tag_name().namespace() == Some(XS_NAMESPACE)
            && c.tag_name().name() != "annotation"
    })
}

pub(crate) fn unexpected_child(parent: Node, child: Node) -> SchemaError {
    SchemaError::UnexpectedChild {
        parent: parent.tag_name().name().to_string(),
        child: child.tag_name().name().to_string(),
    }
}

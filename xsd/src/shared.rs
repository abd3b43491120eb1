use crate::{ComplexTypeDefinition, Ref, SimpleTypeDefinition};
use roxmltree::Node;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDefinition {
    Simple(Ref<SimpleTypeDefinition>),
    Complex(Ref<ComplexTypeDefinition>),
}

/// Property Record: Value Constraint (§3.3, §3.2)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueConstraint {
    Default(String),
    Fixed(String),
}

impl ValueConstraint {
    /// Reads `default`/`fixed` from an element or attribute declaration. Declaring both is an
    /// error (§3.2.3, §3.3.3).
    pub(crate) fn map_from_xml(node: Node) -> Result<Option<Self>, crate::SchemaError> {
        match (node.attribute("default"), node.attribute("fixed")) {
            (Some(_), Some(_)) => Err(crate::SchemaError::InvalidAttribute {
                element: node.tag_name().name().to_string(),
                attribute: "fixed",
                value: "default and fixed are mutually exclusive".to_string(),
            }),
            (Some(default), None) => Ok(Some(Self::Default(default.to_string()))),
            (None, Some(fixed)) => Ok(Some(Self::Fixed(fixed.to_string()))),
            (None, None) => Ok(None),
        }
    }

    pub fn lexical_form(&self) -> &str {
        match self {
            Self::Default(value) | Self::Fixed(value) => value,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }
}

use crate::{error::SchemaError, XS_NAMESPACE};
use addenda_xml::{parse_document, ParseOptions};
use serde::{Deserialize, Serialize};

/// A declared element as written in the schema. Occurrence bounds keep their lexical form
/// (`"unbounded"` included) and default to `"1"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub name: String,
    /// The `type` attribute as written, `None` for inline types.
    pub type_name: Option<String>,
    pub min_occurs: String,
    pub max_occurs: String,
}

/// Introspection of a schema document for documentation and previews. Describes what is
/// declared; it does not validate anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub target_namespace: Option<String>,
    pub element_form_default: String,
    pub attribute_form_default: String,
    /// Named element declarations, global and local, in document order.
    pub elements: Vec<ElementInfo>,
    pub complex_types: Vec<String>,
    pub simple_types: Vec<String>,
}

impl SchemaInfo {
    pub fn read(source: &str, options: &ParseOptions) -> Result<Self, SchemaError> {
        let document = parse_document(source, options)?;
        let root = document.root_element();
        if root.tag_name().namespace() != Some(XS_NAMESPACE) || root.tag_name().name() != "schema"
        {
            return Err(SchemaError::NotASchema(root.tag_name().name().to_string()));
        }

        let mut info = SchemaInfo {
            target_namespace: root.attribute("targetNamespace").map(str::to_string),
            element_form_default: root
                .attribute("elementFormDefault")
                .unwrap_or("unqualified")
                .to_string(),
            attribute_form_default: root
                .attribute("attributeFormDefault")
                .unwrap_or("unqualified")
                .to_string(),
            ..Default::default()
        };

        for node in root.descendants().filter(|n| {
            n.is_element() && n.tag_name().namespace() == Some(XS_NAMESPACE)
        }) {
            let Some(name) = node.attribute("name") else {
                continue;
            };
            match node.tag_name().name() {
                "element" => info.elements.push(ElementInfo {
                    name: name.to_string(),
                    type_name: node.attribute("type").map(str::to_string),
                    min_occurs: node.attribute("minOccurs").unwrap_or("1").to_string(),
                    max_occurs: node.attribute("maxOccurs").unwrap_or("1").to_string(),
                }),
                "complexType" => info.complex_types.push(name.to_string()),
                "simpleType" => info.simple_types.push(name.to_string()),
                _ => {}
            }
        }

        Ok(info)
    }
}

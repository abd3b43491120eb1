use crate::{document::CfdiDocument, error::CfdiError};
use addenda_xml::{
    parse_element, write_element, Element, Node, QualifiedName, WriteOptions, XmlError,
};

/// Where a new `Addenda` goes: `parent` is a path of child indices from the root, `index` the
/// position among the parent's children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionPoint {
    pub parent: Vec<usize>,
    pub index: usize,
}

impl InsertionPoint {
    fn after(mut path: Vec<usize>) -> Self {
        let index = path.pop().map_or(0, |i| i + 1);
        Self {
            parent: path,
            index,
        }
    }
}

impl CfdiDocument {
    /// After `Complemento` if present, else after `Conceptos`, else at the end of the root.
    pub fn insertion_point(&self) -> InsertionPoint {
        for anchor in ["Complemento", "Conceptos"] {
            if let Some(path) = self.root.path_of(&|e: &Element| self.is_cfdi(e, anchor)) {
                return InsertionPoint::after(path);
            }
        }
        InsertionPoint {
            parent: Vec::new(),
            index: self.root.children.len(),
        }
    }

    fn new_addenda(&self) -> Element {
        let prefix = self.root.name.prefix.as_deref();
        Element::new(
            QualifiedName::new(prefix, "Addenda"),
            self.cfdi_namespace().map(str::to_string),
        )
    }

    /// Appends the fragment to the document's `Addenda`, creating it at the
    /// [`insertion_point`](Self::insertion_point) when there is none yet.
    pub fn insert_addenda(mut self, addenda_xml: &str) -> Result<String, CfdiError> {
        let options = self.config.parse_options();
        let mut fragment = parse_element(addenda_xml, &options).map_err(CfdiError::Fragment)?;

        // a fragment without namespace must not end up in the CFDI default namespace
        let default_namespace = self
            .root
            .namespace_declarations()
            .any(|(prefix, uri)| prefix.is_none() && !uri.is_empty());
        let declares_default = fragment
            .namespace_declarations()
            .any(|(prefix, _)| prefix.is_none());
        if fragment.namespace.is_none() && default_namespace && !declares_default {
            fragment.set_attribute("xmlns", "");
        }

        let existing = self.root.path_of(&|e: &Element| self.is_cfdi(e, "Addenda"));
        let path = match existing {
            Some(path) => {
                tracing::debug!(?path, "appending to existing Addenda");
                path
            }
            None => {
                let point = self.insertion_point();
                let addenda = self.new_addenda();
                let parent = self
                    .root
                    .at_path_mut(&point.parent)
                    .ok_or_else(|| no_element(&point.parent))?;
                parent.children.insert(point.index, Node::Element(addenda));
                tracing::debug!(?point, "created Addenda");
                let mut path = point.parent;
                path.push(point.index);
                path
            }
        };

        let addenda = self
            .root
            .at_path_mut(&path)
            .ok_or_else(|| no_element(&path))?;
        addenda.children.push(Node::Element(fragment));

        write_element(&self.root, &WriteOptions::DOCUMENT).map_err(CfdiError::Write)
    }
}

fn no_element(path: &[usize]) -> CfdiError {
    CfdiError::Write(XmlError::Write(format!("no element at {path:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{samples, CfdiParser};
    use pretty_assertions::assert_eq;

    const FRAGMENT: &str = r#"<addenda xmlns="urn:cliente"><folio>1</folio></addenda>"#;

    fn root_children(xml: &str) -> Vec<String> {
        let document = CfdiParser::default().parse(xml).unwrap();
        document
            .root()
            .child_elements()
            .map(|e| e.name.to_string())
            .collect()
    }

    #[test]
    fn after_complemento() {
        let output = CfdiParser::default()
            .insert(samples::WITH_COMPLEMENTO, FRAGMENT)
            .unwrap();
        assert_eq!(
            root_children(&output),
            vec![
                "cfdi:Emisor",
                "cfdi:Receptor",
                "cfdi:Conceptos",
                "cfdi:Impuestos",
                "cfdi:Complemento",
                "cfdi:Addenda",
            ]
        );
        assert!(output.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(output.contains(
            "<cfdi:Addenda>\n    <addenda xmlns=\"urn:cliente\">\n      <folio>1</folio>"
        ));
    }

    #[test]
    fn after_conceptos_without_complemento() {
        let output = CfdiParser::default()
            .insert(samples::WITHOUT_COMPLEMENTO, FRAGMENT)
            .unwrap();
        assert_eq!(
            root_children(&output),
            vec!["cfdi:Emisor", "cfdi:Receptor", "cfdi:Conceptos", "cfdi:Addenda", "cfdi:Impuestos"]
        );
        let conceptos_end = output.find("</cfdi:Conceptos>").unwrap();
        let addenda_start = output.find("<cfdi:Addenda>").unwrap();
        assert!(output[conceptos_end..addenda_start]
            .trim_start_matches("</cfdi:Conceptos>")
            .trim()
            .is_empty());
    }

    #[test]
    fn last_child_otherwise() {
        let document = CfdiParser::default().parse(samples::MINIMAL).unwrap();
        let point = document.insertion_point();
        assert_eq!(point.parent, Vec::<usize>::new());
        assert_eq!(point.index, document.root().children.len());

        let output = document.insert_addenda(FRAGMENT).unwrap();
        assert_eq!(root_children(&output).last().unwrap(), "cfdi:Addenda");
    }

    #[test]
    fn never_two_addenda_elements() {
        let once = CfdiParser::default()
            .insert(samples::WITH_COMPLEMENTO, FRAGMENT)
            .unwrap();
        let twice = CfdiParser::default()
            .insert(&once, r#"<otra xmlns="urn:otra"/>"#)
            .unwrap();
        assert_eq!(twice.matches("<cfdi:Addenda>").count(), 1);
        assert!(twice.contains("<otra xmlns=\"urn:otra\"/>"));
        assert!(twice.contains("<folio>1</folio>"));
    }

    #[test]
    fn default_namespace_document() {
        let output = CfdiParser::default()
            .insert(samples::DEFAULT_NAMESPACE, "<addenda><n>1</n></addenda>")
            .unwrap();
        assert!(output.contains("<Addenda>"), "{output}");
        assert!(output.contains("<addenda xmlns=\"\">"), "{output}");
        let document = CfdiParser::default().parse(&output).unwrap();
        let addenda = document.find("Addenda").unwrap();
        assert_eq!(addenda.child_elements().next().unwrap().namespace, None);
    }

    #[test]
    fn malformed_fragment_is_rejected() {
        let error = CfdiParser::default()
            .insert(samples::WITH_COMPLEMENTO, "<addenda>")
            .unwrap_err();
        assert!(matches!(error, CfdiError::Fragment(_)));
    }
}

use crate::{config::ParserConfig, error::CfdiError};
use addenda_xml::{parse_element, write_element, Element, WriteOptions};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct CfdiParser {
    config: ParserConfig,
}

impl CfdiParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Size check first, then a parse with DTDs refused.
    pub fn parse(&self, xml: &str) -> Result<CfdiDocument, CfdiError> {
        let root = parse_element(xml, &self.config.parse_options())?;
        let document = CfdiDocument::new(root, self.config.clone());
        tracing::debug!(
            root = %document.root.name,
            version = document.version().unwrap_or(""),
            "parsed CFDI"
        );
        Ok(document)
    }

    /// [`parse`](Self::parse) followed by [`CfdiDocument::validate_structure`].
    pub fn parse_validated(&self, xml: &str) -> Result<CfdiDocument, CfdiError> {
        let document = self.parse(xml)?;
        document.validate_structure()?;
        Ok(document)
    }

    pub fn insert(&self, cfdi_xml: &str, addenda_xml: &str) -> Result<String, CfdiError> {
        self.parse(cfdi_xml)?.insert_addenda(addenda_xml)
    }
}

/// A parsed CFDI. Elements of the CFDI vocabulary are looked up in the namespace of the root
/// element, whichever prefix (if any) the document binds it to.
#[derive(Debug, Clone)]
pub struct CfdiDocument {
    pub(crate) root: Element,
    namespaces: BTreeMap<String, String>,
    pub(crate) config: ParserConfig,
}

impl CfdiDocument {
    fn new(root: Element, config: ParserConfig) -> Self {
        let mut namespaces = BTreeMap::new();
        let mut default_namespace = None;
        for element in std::iter::once(&root).chain(root.descendants()) {
            for (prefix, uri) in element.namespace_declarations() {
                match prefix {
                    Some(prefix) => {
                        namespaces
                            .entry(prefix.to_string())
                            .or_insert_with(|| uri.to_string());
                    }
                    None if default_namespace.is_none() && !uri.is_empty() => {
                        default_namespace = Some(uri.to_string());
                    }
                    None => {}
                }
            }
        }

        let aliases = &config.namespaces;
        if !namespaces.contains_key(&aliases.cfdi_prefix) {
            let uri = root
                .namespace
                .clone()
                .or(default_namespace)
                .unwrap_or_else(|| aliases.cfdi_uri.clone());
            namespaces.insert(aliases.cfdi_prefix.clone(), uri);
        }
        namespaces
            .entry(aliases.tfd_prefix.clone())
            .or_insert_with(|| aliases.tfd_uri.clone());

        Self {
            root,
            namespaces,
            config,
        }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn version(&self) -> Option<&str> {
        self.root.attribute("Version")
    }

    /// Prefix to URI, always containing the configured `cfdi` and `tfd` aliases.
    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        &self.namespaces
    }

    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    /// Namespace of the CFDI vocabulary in this document; `None` if the document uses none.
    pub fn cfdi_namespace(&self) -> Option<&str> {
        self.root.namespace.as_deref()
    }

    pub(crate) fn is_cfdi(&self, element: &Element, local: &str) -> bool {
        element.is(self.cfdi_namespace(), local)
    }

    /// First CFDI element named `local` in document order, the root excluded.
    pub fn find(&self, local: &str) -> Option<&Element> {
        self.root.descendants().find(|e| self.is_cfdi(e, local))
    }

    pub fn has_addenda(&self) -> bool {
        self.find("Addenda").is_some()
    }

    /// Serializes with an XML declaration, pretty printed.
    pub fn to_xml(&self) -> Result<String, CfdiError> {
        write_element(&self.root, &WriteOptions::DOCUMENT).map_err(CfdiError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples;
    use addenda_xml::XmlError;
    use pretty_assertions::assert_eq;

    #[test]
    fn oversized_input_is_rejected_before_parsing() {
        let parser = CfdiParser::new(ParserConfig {
            max_size: 8,
            ..Default::default()
        });
        let error = parser.parse("<not even xml").unwrap_err();
        assert!(error.is_too_large());
        assert_eq!(
            error,
            CfdiError::Xml(XmlError::InputTooLarge { size: 13, limit: 8 })
        );
    }

    #[test]
    fn doctype_is_refused() {
        let xml = r#"<!DOCTYPE x [<!ENTITY e SYSTEM "file:///etc/passwd">]><cfdi:Comprobante xmlns:cfdi="http://www.sat.gob.mx/cfd/4">&e;</cfdi:Comprobante>"#;
        assert!(matches!(
            CfdiParser::default().parse(xml),
            Err(CfdiError::Xml(XmlError::Malformed { .. }))
        ));
    }

    #[test]
    fn namespace_aliases() {
        let document = CfdiParser::default().parse(samples::WITH_COMPLEMENTO).unwrap();
        assert_eq!(document.namespace_uri("cfdi"), Some("http://www.sat.gob.mx/cfd/4"));
        assert_eq!(
            document.namespace_uri("tfd"),
            Some("http://www.sat.gob.mx/TimbreFiscalDigital")
        );
        assert!(!document.has_addenda());
    }

    #[test]
    fn default_namespace_gets_the_cfdi_alias() {
        let document = CfdiParser::default()
            .parse(samples::DEFAULT_NAMESPACE)
            .unwrap();
        assert_eq!(document.namespace_uri("cfdi"), Some("http://www.sat.gob.mx/cfd/4"));
        assert_eq!(
            document.namespace_uri("tfd"),
            Some("http://www.sat.gob.mx/TimbreFiscalDigital")
        );
        assert_eq!(document.cfdi_namespace(), Some("http://www.sat.gob.mx/cfd/4"));
        assert!(document.find("Emisor").is_some());
    }

    #[test]
    fn detects_existing_addenda() {
        let xml = samples::WITH_COMPLEMENTO.replace(
            "</cfdi:Comprobante>",
            "<cfdi:Addenda><x/></cfdi:Addenda></cfdi:Comprobante>",
        );
        assert!(CfdiParser::default().parse(&xml).unwrap().has_addenda());
    }
}

use crate::document::CfdiDocument;
use thiserror::Error;

/// The first reason a document is not a usable CFDI 4.x.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureViolation {
    #[error("the root element '{0}' is not a Comprobante")]
    NotAComprobante(String),

    #[error("CFDI version '{0}' is not supported, a 4.x version is required")]
    UnsupportedVersion(String),

    #[error("the required element '{0}' is missing")]
    MissingElement(&'static str),
}

const REQUIRED_ELEMENTS: [&str; 3] = ["Emisor", "Receptor", "Conceptos"];

impl CfdiDocument {
    pub fn validate_structure(&self) -> Result<(), StructureViolation> {
        let root = self.root();
        if !root.local_name().contains("Comprobante") {
            return Err(StructureViolation::NotAComprobante(root.name.to_string()));
        }

        let version = root.attribute("Version").unwrap_or_default();
        if !version.starts_with("4.") {
            return Err(StructureViolation::UnsupportedVersion(version.to_string()));
        }

        for name in REQUIRED_ELEMENTS {
            if self.find(name).is_none() {
                return Err(StructureViolation::MissingElement(name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{samples, CfdiParser};
    use pretty_assertions::assert_eq;

    fn check(xml: &str) -> Result<(), StructureViolation> {
        CfdiParser::default().parse(xml).unwrap().validate_structure()
    }

    #[test]
    fn complete_document_passes() {
        assert_eq!(check(samples::WITH_COMPLEMENTO), Ok(()));
    }

    #[test]
    fn reports_the_specific_reason() {
        assert_eq!(
            check("<Factura Version=\"4.0\"/>"),
            Err(StructureViolation::NotAComprobante("Factura".to_string()))
        );
        assert_eq!(
            check(&samples::WITH_COMPLEMENTO.replace("Version=\"4.0\"", "Version=\"3.3\"")),
            Err(StructureViolation::UnsupportedVersion("3.3".to_string()))
        );
        assert_eq!(
            check(samples::MINIMAL),
            Err(StructureViolation::MissingElement("Conceptos"))
        );
        let error = check(&samples::WITH_COMPLEMENTO.replace("cfdi:Receptor", "cfdi:Otro"))
            .unwrap_err();
        assert_eq!(error, StructureViolation::MissingElement("Receptor"));
        assert_eq!(error.to_string(), "the required element 'Receptor' is missing");
    }
}

use crate::structure::StructureViolation;
use addenda_xml::XmlError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CfdiError {
    /// The CFDI document is too large or not well-formed.
    #[error("invalid CFDI document: {0}")]
    Xml(#[from] XmlError),

    #[error("invalid CFDI structure: {0}")]
    Structure(#[from] StructureViolation),

    #[error("invalid addenda fragment: {0}")]
    Fragment(XmlError),

    #[error("failed to write the CFDI document: {0}")]
    Write(XmlError),
}

impl CfdiError {
    pub fn is_too_large(&self) -> bool {
        matches!(
            self,
            Self::Xml(XmlError::InputTooLarge { .. }) | Self::Fragment(XmlError::InputTooLarge { .. })
        )
    }
}

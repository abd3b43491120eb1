use addenda_xml::XmlError;
use thiserror::Error;

/// Only raised in strict mode; lenient resolution turns both cases into an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("variable '{0}' is not defined")]
    Unresolved(String),

    #[error("cannot evaluate expression '{0}'")]
    InvalidExpression(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The rendered text is not well-formed (or too large); carries the parser message.
    #[error("rendered addenda is not well-formed XML: {0}")]
    Malformed(#[from] XmlError),
}

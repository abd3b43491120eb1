use addenda_cfdi::CfdiError;
use addenda_template::BuildError;
use addenda_xsd::{SchemaError, ValidationReport};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("addenda type '{0}' has more than one default template")]
    MultipleDefaults(String),

    #[error("addenda type '{0}' has no default template")]
    NoTemplate(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Cfdi(#[from] CfdiError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("the XSD schema of the addenda type does not compile: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("the template rendered an empty addenda")]
    EmptyAddenda,

    #[error("required fields without a value: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("the addenda is not valid against its schema ({} errors)", .0.error_count)]
    SchemaViolation(Box<ValidationReport>),

    #[error("failed to expose line items to the template: {0}")]
    LineItems(#[from] serde_json::Error),
}

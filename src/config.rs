//! `addenda.toml`
//!
//! ```toml
//! validate_structure = true
//!
//! [parser]
//! max_size = 5242880
//!
//! [parser.namespaces]
//! cfdi_prefix = "cfdi"
//! cfdi_uri = "http://www.sat.gob.mx/cfd/4"
//!
//! [render]
//! mode = "strict"
//!
//! [validation]
//! policy = "enforce"
//! ```
use crate::error::ConfigError;
use addenda_cfdi::ParserConfig;
use addenda_template::ResolveMode;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a generation does with the XSD of the addenda type.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Do not validate.
    Skip,
    /// Validate and attach the report to the outcome.
    #[default]
    Report,
    /// Fail when the addenda is invalid.
    Enforce,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub mode: ResolveMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub policy: ValidationPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddendaConfig {
    pub parser: ParserConfig,
    pub render: RenderConfig,
    pub validation: ValidationConfig,
    /// Reject CFDI documents that fail the structure check before rendering.
    pub validate_structure: bool,
}

impl Default for AddendaConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            render: RenderConfig::default(),
            validation: ValidationConfig::default(),
            validate_structure: true,
        }
    }
}

impl AddendaConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}

use addenda_xml::{ParseOptions, DEFAULT_MAX_SIZE};
use serde::{Deserialize, Serialize};

pub const CFDI_4_NAMESPACE: &str = "http://www.sat.gob.mx/cfd/4";
pub const TFD_NAMESPACE: &str = "http://www.sat.gob.mx/TimbreFiscalDigital";

/// Prefixes and namespace URIs the parser relies on. A new CFDI revision only needs a different
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    pub cfdi_prefix: String,
    pub cfdi_uri: String,
    pub tfd_prefix: String,
    pub tfd_uri: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            cfdi_prefix: "cfdi".to_string(),
            cfdi_uri: CFDI_4_NAMESPACE.to_string(),
            tfd_prefix: "tfd".to_string(),
            tfd_uri: TFD_NAMESPACE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// In bytes, checked before parsing.
    pub max_size: usize,
    pub namespaces: NamespaceConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            namespaces: NamespaceConfig::default(),
        }
    }
}

impl ParserConfig {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_size: self.max_size,
        }
    }
}

//! Generates customer specific addendas for signed CFDI 4.0 invoices: a template is rendered
//! against the invoice data, checked against the XSD of its addenda type and merged into the
//! invoice at the position the CFDI schema mandates.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;

pub use config::{AddendaConfig, ValidationPolicy};
pub use error::{ConfigError, GenerationError, ModelError};
pub use model::{
    select_template, AddendaConfiguration, AddendaTemplate, AddendaType, DynamicField,
    DynamicSource, FieldDefinition, FieldSource, FieldValue,
};
pub use pipeline::{AddendaGenerator, GenerationOutcome, GenerationRequest};

pub use addenda_cfdi as cfdi;
pub use addenda_template as template;
pub use addenda_xsd as xsd;

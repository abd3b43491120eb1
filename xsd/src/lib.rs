//! Compiles a single XSD document into schema components and validates instance documents
//! against it, producing libxml2-style diagnostics, fix suggestions and schema summaries.
//!
//! The component model follows XML Schema 1.1 Part 1 (structures); section references in the
//! comments (e.g. §3.3.2) point there.

pub mod attribute_use;
pub mod complex_type_def;
pub mod constraining_facet;
pub mod element_decl;
pub mod error;
pub mod info;
pub mod model_group;
pub mod particle;
pub mod report;
pub mod schema;
pub mod shared;
pub mod simple_type_def;
pub mod state_machine;
pub mod suggestions;
pub mod validator;
pub mod wildcard;
pub mod xstypes;

mod components;
mod mapping_context;
mod validation;
mod values;

pub use attribute_use::AttributeUse;
pub use complex_type_def::ComplexTypeDefinition;
pub use constraining_facet::ConstrainingFacet;
pub use element_decl::ElementDeclaration;
pub use error::SchemaError;
pub use info::{ElementInfo, SchemaInfo};
pub use model_group::ModelGroup;
pub use particle::Particle;
pub use report::{ValidationIssue, ValidationOutcome, ValidationReport};
pub use schema::CompiledSchema;
pub use shared::TypeDefinition;
pub use simple_type_def::SimpleTypeDefinition;
pub use suggestions::suggest;
pub use validator::{SchemaState, XsdValidator};
pub use wildcard::Wildcard;
pub use xstypes::XS_NAMESPACE;

pub use components::{ComponentTable, Ref, SchemaComponentTable};

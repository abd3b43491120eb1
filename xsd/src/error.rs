use addenda_xml::XmlError;
use thiserror::Error;

/// Reasons a schema fails to compile. A validator is never constructed from a schema that
/// produced one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("the schema is not well-formed XML: {0}")]
    Xml(#[from] XmlError),

    #[error("the root element must be xs:schema, found {0:?}")]
    NotASchema(String),

    #[error("failed to resolve prefix {0:?} to a namespace URI")]
    NamePrefixNotResolved(String),

    #[error("{kind} {name} is referenced but not declared")]
    UnresolvedReference { kind: &'static str, name: String },

    #[error("{kind} {name} is declared more than once")]
    DuplicateDeclaration { kind: &'static str, name: String },

    #[error("<xs:{element}> requires the attribute {attribute:?}")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("invalid value {value:?} for attribute {attribute:?} of <xs:{element}>")]
    InvalidAttribute {
        element: String,
        attribute: &'static str,
        value: String,
    },

    #[error("maxOccurs ({max}) must not be smaller than minOccurs ({min})")]
    InvalidOccurrence { min: u64, max: u64 },

    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("{0} is not a simple type definition")]
    NotSimple(String),

    #[error("the definition of {0} refers to itself")]
    Circular(String),

    #[error("unexpected <xs:{child}> inside <xs:{parent}>")]
    UnexpectedChild { parent: String, child: String },

    #[error("<xs:{0}> is not supported")]
    Unsupported(String),

    #[error(
        "the content model of {0} needs more than {limit} automaton states, reduce its occurrence bounds",
        limit = crate::state_machine::MAX_STATES
    )]
    ContentModelTooLarge(String),

    /// Unique Particle Attribution (§3.8.6.4)
    #[error("the content model of {owner} is ambiguous: more than one particle can match {name}")]
    AmbiguousContentModel { owner: String, name: String },
}

impl SchemaError {
    /// Line of the offending schema text, `0` when unknown.
    pub fn line(&self) -> u32 {
        match self {
            Self::Xml(error) => error.line(),
            _ => 0,
        }
    }
}

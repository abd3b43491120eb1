//! XML plumbing shared by the template renderer, the CFDI inserter and the XSD validator.
//!
//! Parsing goes through [`roxmltree`] with DTD processing disabled, which also rules out external
//! entities. Every parse is preceded by a size check. Documents that need to be modified are
//! converted into an owned [`Element`] tree and written back out with [`quick_xml`].

pub mod error;
pub mod parse;
pub mod tree;
pub mod writer;

pub use error::XmlError;
pub use parse::{check_size, line_of, parse_document, ParseOptions, DEFAULT_MAX_SIZE};
pub use tree::{Attribute, Element, Node, QualifiedName};
pub use writer::{escape_text, write_element, WriteOptions};

/// Parses `input` and converts its root element into an owned tree.
pub fn parse_element(input: &str, options: &ParseOptions) -> Result<Element, XmlError> {
    let document = parse_document(input, options)?;
    Ok(Element::from_document(&document, input))
}

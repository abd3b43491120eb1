use crate::XmlError;

/// 5 MiB
pub const DEFAULT_MAX_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Upper bound for the input length in bytes, checked before any parsing happens.
    pub max_size: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

pub fn check_size(input: &str, max_size: usize) -> Result<(), XmlError> {
    if input.len() > max_size {
        tracing::warn!(size = input.len(), limit = max_size, "Rejecting oversized XML input");
        return Err(XmlError::InputTooLarge {
            size: input.len(),
            limit: max_size,
        });
    }
    Ok(())
}

/// Parses a namespace-aware document. A document type declaration is rejected outright.
pub fn parse_document<'input>(
    input: &'input str,
    options: &ParseOptions,
) -> Result<roxmltree::Document<'input>, XmlError> {
    check_size(input, options.max_size)?;
    let parsing_options = roxmltree::ParsingOptions {
        allow_dtd: false,
        ..Default::default()
    };
    Ok(roxmltree::Document::parse_with_options(
        input,
        parsing_options,
    )?)
}

/// 1-based line on which `node` starts.
pub fn line_of(document: &roxmltree::Document, node: roxmltree::Node) -> u32 {
    document.text_pos_at(node.range().start).row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_input_before_parsing() {
        let options = ParseOptions { max_size: 8 };
        // not even well-formed, the size check has to come first
        let error = parse_document("<a><b></a>", &options).unwrap_err();
        assert_eq!(error, XmlError::InputTooLarge { size: 10, limit: 8 });
    }

    #[test]
    fn rejects_dtd() {
        let input = r#"<?xml version="1.0"?>
<!DOCTYPE foo [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<foo>&xxe;</foo>"#;
        let error = parse_document(input, &ParseOptions::default()).unwrap_err();
        assert!(matches!(error, XmlError::Malformed { .. }));
    }

    #[test]
    fn reports_position_of_syntax_errors() {
        let error = parse_document("<a>\n<b>\n</a>", &ParseOptions::default()).unwrap_err();
        match error {
            XmlError::Malformed { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn finds_line_numbers() {
        let input = "<a>\n  <b/>\n  <c/>\n</a>";
        let document = parse_document(input, &ParseOptions::default()).unwrap();
        let c = document
            .descendants()
            .find(|n| n.has_tag_name("c"))
            .unwrap();
        assert_eq!(line_of(&document, c), 3);
    }
}

use std::borrow::Cow;

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

use crate::{Element, Node, XmlError};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` first.
    pub declaration: bool,
    /// Pretty print with this many spaces per level. Whitespace-only text is dropped when set.
    pub indent: Option<usize>,
}

impl WriteOptions {
    pub const COMPACT: Self = Self {
        declaration: false,
        indent: None,
    };

    pub const DOCUMENT: Self = Self {
        declaration: true,
        indent: Some(2),
    };
}

/// Escapes `&`, `<`, `>`, `"` and `'`.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

pub fn write_element(element: &Element, options: &WriteOptions) -> Result<String, XmlError> {
    let mut writer = match options.indent {
        Some(indent) => Writer::new_with_indent(Vec::new(), b' ', indent),
        None => Writer::new(Vec::new()),
    };

    if options.declaration {
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| XmlError::Write(e.to_string()))?;
    }
    write_node(&mut writer, element, options.indent.is_some())?;

    let mut output =
        String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Write(e.to_string()))?;
    if options.indent.is_some() {
        output.push('\n');
    }
    Ok(output)
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    pretty: bool,
) -> Result<(), XmlError> {
    let name = element.name.to_string();
    let mut start = BytesStart::new(name.as_str());
    for attribute in &element.attributes {
        let key = attribute.name.to_string();
        start.push_attribute((key.as_str(), attribute.value.as_str()));
    }

    let significant = |node: &&Node| match node {
        Node::Text(text) => !(pretty && text.trim().is_empty()),
        _ => true,
    };

    if !element.children.iter().any(|c| significant(&c)) {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| XmlError::Write(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| XmlError::Write(e.to_string()))?;
    for child in element.children.iter().filter(significant) {
        match child {
            Node::Element(child) => write_node(writer, child, pretty)?,
            Node::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| XmlError::Write(e.to_string()))?,
            Node::Comment(comment) => writer
                .write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))
                .map_err(|e| XmlError::Write(e.to_string()))?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(name.as_str())))
        .map_err(|e| XmlError::Write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_element, ParseOptions};
    use pretty_assertions::assert_eq;

    #[test]
    fn escapes_all_predefined_entities() {
        assert_eq!(
            escape_text(r#"A & B <c> "d" 'e'"#),
            "A &amp; B &lt;c&gt; &quot;d&quot; &apos;e&apos;"
        );
        assert!(matches!(escape_text("PO-1"), Cow::Borrowed("PO-1")));
    }

    #[test]
    fn compact_round_trip() {
        let input = r#"<a xmlns="urn:x" k="1 &amp; 2"><b>t &lt; u</b><c/></a>"#;
        let element = parse_element(input, &ParseOptions::default()).unwrap();
        let output = write_element(&element, &WriteOptions::COMPACT).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn pretty_prints_with_declaration() {
        let input = "<a>\n      <b>x</b>\n<c/></a>";
        let element = parse_element(input, &ParseOptions::default()).unwrap();
        let output = write_element(&element, &WriteOptions::DOCUMENT).unwrap();
        assert_eq!(
            output,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<a>\n  <b>x</b>\n  <c/>\n</a>\n"
        );
    }
}

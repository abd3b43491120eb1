use crate::{context::VariableContext, error::BuildError, resolver::Resolver};
use addenda_xml::{escape_text, parse_element, write_element, ParseOptions, WriteOptions};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*(.+?)\s*\}\}").unwrap();
}

/// Expressions of all `{{ ... }}` placeholders in order of appearance, duplicates included.
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .collect()
}

/// Substitutes placeholders and checks that the result is well-formed XML.
///
/// Only `{{ expr }}` is interpreted; `{% ... %}` tags are copied through unchanged.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    resolver: Resolver,
    namespace: Option<String>,
    options: ParseOptions,
}

impl TemplateRenderer {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            ..Default::default()
        }
    }

    /// Sets `xmlns` on the root element of every rendered fragment. Calling it again replaces the
    /// namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn render(&self, template: &str, context: &VariableContext) -> Result<String, BuildError> {
        if template.trim().is_empty() {
            return Ok(String::new());
        }

        let mut output = String::with_capacity(template.len());
        let mut last = 0;
        for captures in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(expression)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            output.push_str(&template[last..whole.start()]);
            let value = self.resolver.resolve(expression.as_str(), context)?;
            output.push_str(&escape_text(&value));
            last = whole.end();
        }
        output.push_str(&template[last..]);

        let mut root = parse_element(&output, &self.options)?;
        let Some(namespace) = &self.namespace else {
            return Ok(output);
        };
        root.set_attribute("xmlns", namespace.as_str());
        tracing::debug!(namespace = %namespace, root = %root.name, "set addenda namespace");
        Ok(write_element(&root, &WriteOptions::COMPACT)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::ContextBuilder, error::ResolveError};
    use addenda_xml::XmlError;
    use pretty_assertions::assert_eq;

    fn render(template: &str, context: &VariableContext) -> Result<String, BuildError> {
        TemplateRenderer::default().render(template, context)
    }

    #[test]
    fn substitutes_all_placeholders() {
        let context = ContextBuilder::new()
            .cfdi_data([("uuid", "ABC-123"), ("total", "500.00")])
            .build();
        let xml = render(
            "<addenda><folio>{{ cfdi_uuid }}</folio><total>{{cfdi_total}}</total></addenda>",
            &context,
        )
        .unwrap();
        assert_eq!(
            xml,
            "<addenda><folio>ABC-123</folio><total>500.00</total></addenda>"
        );
        assert!(!xml.contains("{{"));
    }

    #[test]
    fn missing_variables_become_empty() {
        let xml = render("<a b=\"{{ nope }}\">{{ nada | uppercase }}</a>", &VariableContext::default())
            .unwrap();
        assert_eq!(xml, "<a b=\"\"></a>");
    }

    #[test]
    fn escapes_resolved_values_only() {
        let value = r#"A & B <c> "d" 'e'"#;
        let context = ContextBuilder::new().field("v", value).build();
        let xml = render("<x>{{ v }}</x>", &context).unwrap();
        let parsed = parse_element(&xml, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.text_content(), value);
    }

    #[test]
    fn empty_template() {
        assert_eq!(render("", &VariableContext::default()).unwrap(), "");
        assert_eq!(render("  \n", &VariableContext::default()).unwrap(), "");
    }

    #[test]
    fn malformed_output_fails() {
        let error = render("<a><b>{{ x }}</a>", &VariableContext::default()).unwrap_err();
        assert!(matches!(error, BuildError::Malformed(XmlError::Malformed { .. })));
    }

    #[test]
    fn namespace_is_idempotent() {
        let renderer = TemplateRenderer::default()
            .with_namespace("urn:first")
            .with_namespace("urn:cliente");
        let context = ContextBuilder::new().field("n", "1").build();
        let once = renderer.render("<addenda><n>{{ n }}</n></addenda>", &context).unwrap();
        assert_eq!(once, r#"<addenda xmlns="urn:cliente"><n>1</n></addenda>"#);
        let again = renderer.render(&once, &context).unwrap();
        assert_eq!(again, once);
    }

    #[test]
    fn block_tags_pass_through() {
        let template = "<a>{% for c in conceptos %}{{ x }}{% endfor %}</a>";
        let context = ContextBuilder::new().field("x", "1").build();
        assert_eq!(
            render(template, &context).unwrap(),
            "<a>{% for c in conceptos %}1{% endfor %}</a>"
        );
    }

    #[test]
    fn strict_resolution_error_propagates() {
        let renderer = TemplateRenderer::new(Resolver::strict());
        assert_eq!(
            renderer.render("<a>{{ x }}</a>", &VariableContext::default()),
            Err(BuildError::Resolve(ResolveError::Unresolved("x".to_string())))
        );
    }

    #[test]
    fn lists_placeholders() {
        assert_eq!(
            placeholders("<a>{{ a }}{{b|upper}}{{ a }}</a>"),
            vec!["a", "b|upper", "a"]
        );
    }
}

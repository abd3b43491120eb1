//! Instance validation against a [`CompiledSchema`].
//!
//! Diagnostics are phrased the way libxml2 phrases them, so that downstream tooling which pattern
//! matches on those messages keeps working.
use crate::{
    complex_type_def::ContentType,
    report::ValidationIssue,
    shared::ValueConstraint,
    state_machine::Transition,
    wildcard::{NamespaceConstraint, ProcessContents},
    xstypes::XSI_NAMESPACE,
    CompiledSchema, ComplexTypeDefinition, ElementDeclaration, Ref, SimpleTypeDefinition,
    TypeDefinition,
};
use roxmltree::{Document, Node};

/// `{uri}local`, or just `local` without a namespace.
pub(crate) fn clark_name(namespace: Option<&str>, local_name: &str) -> String {
    match namespace {
        Some(namespace) => format!("{{{namespace}}}{local_name}"),
        None => local_name.to_string(),
    }
}

/// `Expected is ( a )` or `Expected is one of ( a, b )`.
fn expected_clause(expected: &[String]) -> String {
    match expected {
        [single] => format!(" Expected is ( {single} )."),
        many => format!(" Expected is one of ( {} ).", many.join(", ")),
    }
}

pub(crate) struct InstanceValidator<'s, 'd, 'input> {
    schema: &'s CompiledSchema,
    document: &'d Document<'input>,
    errors: Vec<ValidationIssue>,
}

impl<'s, 'd, 'input> InstanceValidator<'s, 'd, 'input> {
    pub(crate) fn new(schema: &'s CompiledSchema, document: &'d Document<'input>) -> Self {
        Self {
            schema,
            document,
            errors: Vec::new(),
        }
    }

    /// Validates the whole document and returns the errors in document order.
    pub(crate) fn run(mut self) -> Vec<ValidationIssue> {
        let root = self.document.root_element();
        let namespace = root.tag_name().namespace();
        let local_name = root.tag_name().name();

        match self.schema.global_element(namespace, local_name) {
            Some(declaration) => self.validate_element(root, declaration),
            None => {
                let mut message =
                    "No matching global declaration available for the validation root.".to_string();
                if let Some(other) = self.schema.global_element_by_local_name(local_name) {
                    let expected = other.get(&self.schema.components);
                    match expected.target_namespace.as_deref() {
                        Some(ns) => message.push_str(&format!(
                            " The schema declares '{local_name}' in the namespace '{ns}'."
                        )),
                        None => message.push_str(&format!(
                            " The schema declares '{local_name}' without a namespace."
                        )),
                    }
                }
                self.element_error(root, &message);
            }
        }
        self.errors
    }

    fn element_name(node: Node) -> String {
        clark_name(node.tag_name().namespace(), node.tag_name().name())
    }

    fn position(&self, node: Node) -> (u32, u32) {
        let pos = self.document.text_pos_at(node.range().start);
        (pos.row, pos.col)
    }

    fn element_error(&mut self, node: Node, message: &str) {
        let (line, column) = self.position(node);
        let message = format!("Element '{}': {message}", Self::element_name(node));
        self.errors.push(ValidationIssue::new(line, column, message));
    }

    fn attribute_error(&mut self, node: Node, attribute: &str, message: &str) {
        let (line, column) = self.position(node);
        let message = format!(
            "Element '{}', attribute '{attribute}': {message}",
            Self::element_name(node)
        );
        self.errors.push(ValidationIssue::new(line, column, message));
    }

    /// Element Locally Valid (Element) (§3.3.4.3)
    fn validate_element(&mut self, node: Node, declaration: Ref<ElementDeclaration>) {
        let schema = self.schema;
        let declaration = declaration.get(&schema.components);

        if declaration.abstract_ {
            self.element_error(node, "The element declaration is abstract.");
            return;
        }

        if let Some(nil) = node.attribute((XSI_NAMESPACE, "nil")) {
            let nilled = matches!(nil.trim(), "true" | "1");
            if !declaration.nillable {
                self.element_error(node, "The element is not 'nillable'.");
            } else if nilled {
                let has_content = node
                    .children()
                    .any(|c| c.is_element() || (c.is_text() && !is_whitespace(c.text())));
                if has_content {
                    self.element_error(
                        node,
                        "The element cannot have character or element children because it is 'nilled'.",
                    );
                }
                return;
            }
        }

        match declaration.type_definition {
            TypeDefinition::Simple(simple) => {
                self.validate_attributes(node, None);
                if node.children().any(|c| c.is_element()) {
                    self.element_error(
                        node,
                        "Element content is not allowed, because the type definition is simple.",
                    );
                    return;
                }
                self.validate_text(node, simple, declaration.value_constraint.as_ref());
            }
            TypeDefinition::Complex(complex) => {
                self.validate_complex(node, complex, declaration.value_constraint.as_ref())
            }
        }
    }

    /// Element Locally Valid (Complex Type) (§3.4.4.2)
    fn validate_complex(
        &mut self,
        node: Node,
        complex: Ref<ComplexTypeDefinition>,
        value_constraint: Option<&ValueConstraint>,
    ) {
        let schema = self.schema;
        let definition = complex.get(&schema.components);
        self.validate_attributes(node, Some(definition));

        match &definition.content_type {
            ContentType::Empty => {
                if node.children().any(|c| c.is_element()) {
                    self.element_error(
                        node,
                        "Element content is not allowed, because the content type is empty.",
                    );
                } else if node.children().any(|c| c.is_text() && !is_whitespace(c.text())) {
                    self.element_error(
                        node,
                        "Character content is not allowed, because the content type is empty.",
                    );
                }
            }
            ContentType::Simple(simple) => {
                if node.children().any(|c| c.is_element()) {
                    self.element_error(
                        node,
                        "Element content is not allowed, because the content type is a simple type definition.",
                    );
                    return;
                }
                self.validate_text(node, *simple, value_constraint);
            }
            ContentType::ElementOnly(_) | ContentType::Mixed(_) => {
                if !definition.content_type.is_mixed()
                    && node.children().any(|c| c.is_text() && !is_whitespace(c.text()))
                {
                    self.element_error(
                        node,
                        "Character content other than whitespace is not allowed because the content type is 'element-only'.",
                    );
                }
                self.validate_children(node, complex);
            }
        }
    }

    /// Element Sequence Locally Valid (Complex Content) (§3.4.4.3)
    fn validate_children(&mut self, node: Node, complex: Ref<ComplexTypeDefinition>) {
        let schema = self.schema;
        let Some(model) = schema.content_model(complex) else {
            return;
        };
        let mut matcher = model.matcher();

        for child in node.children().filter(|c| c.is_element()) {
            let namespace = child.tag_name().namespace();
            let local_name = child.tag_name().name();
            match matcher.step(namespace, local_name, &schema.components) {
                Ok(Transition::ElementDeclaration(declaration)) => {
                    self.validate_element(child, declaration)
                }
                Ok(Transition::Wildcard(wildcard)) => {
                    let process_contents = wildcard.get(&schema.components).process_contents;
                    self.validate_wildcard_element(child, process_contents);
                }
                Err(expected) => {
                    let expected = self.describe(&expected);
                    let message = if expected.is_empty() {
                        "This element is not expected.".to_string()
                    } else {
                        format!("This element is not expected.{}", expected_clause(&expected))
                    };
                    self.element_error(child, &message);
                    // The rest of the content cannot be matched meaningfully
                    return;
                }
            }
        }

        if let Err(expected) = matcher.finish() {
            let expected = self.describe(&expected);
            let message = if expected.is_empty() {
                "Missing child element(s).".to_string()
            } else {
                format!("Missing child element(s).{}", expected_clause(&expected))
            };
            self.element_error(node, &message);
        }
    }

    fn validate_wildcard_element(&mut self, node: Node, process_contents: ProcessContents) {
        let declaration = self
            .schema
            .global_element(node.tag_name().namespace(), node.tag_name().name());
        match (process_contents, declaration) {
            (ProcessContents::Skip, _) => {}
            (_, Some(declaration)) => self.validate_element(node, declaration),
            (ProcessContents::Lax, None) => {}
            (ProcessContents::Strict, None) => self.element_error(
                node,
                "No matching global element declaration available, but demanded by the strict wildcard.",
            ),
        }
    }

    /// Names of the expected elements, without repetitions, in declaration order.
    fn describe(&self, transitions: &[Transition]) -> Vec<String> {
        let mut names = Vec::<String>::new();
        let described = transitions
            .iter()
            .map(|transition| match transition {
                Transition::ElementDeclaration(declaration) => {
                    let declaration = declaration.get(&self.schema.components);
                    clark_name(declaration.target_namespace.as_deref(), &declaration.name)
                }
                Transition::Wildcard(wildcard) => {
                    match &wildcard.get(&self.schema.components).namespace_constraint {
                        NamespaceConstraint::Any => "##any".to_string(),
                        NamespaceConstraint::Not(namespaces) => {
                            match namespaces.first().cloned().flatten() {
                                Some(namespace) => format!("##other{{{namespace}}}*"),
                                None => "##other*".to_string(),
                            }
                        }
                        NamespaceConstraint::Enumeration(namespaces) => namespaces
                            .iter()
                            .map(|ns| clark_name(ns.as_deref(), "*"))
                            .collect::<Vec<_>>()
                            .join(" | "),
                    }
                }
            });
        for name in described {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Text content of a simple-typed element, with default and fixed values applied (§3.3.4.3).
    fn validate_text(
        &mut self,
        node: Node,
        simple: Ref<SimpleTypeDefinition>,
        value_constraint: Option<&ValueConstraint>,
    ) {
        let text = node
            .children()
            .filter(|c| c.is_text())
            .filter_map(|c| c.text())
            .collect::<String>();
        let value = match value_constraint {
            Some(constraint) if text.is_empty() => constraint.lexical_form(),
            _ => text.as_str(),
        };

        let schema = self.schema;
        let definition = simple.get(&schema.components);
        if let Err(message) = definition.validate(value, &schema.components) {
            self.element_error(node, &message);
            return;
        }
        if let Some(ValueConstraint::Fixed(fixed)) = value_constraint {
            if !values_match(definition, value, fixed) {
                self.element_error(
                    node,
                    &format!("The value '{value}' does not match the fixed value constraint '{fixed}'."),
                );
            }
        }
    }

    /// Attribute Locally Valid (Use) and Complex Type's attribute checks (§3.4.4.2, 3–4)
    fn validate_attributes(&mut self, node: Node, complex: Option<&ComplexTypeDefinition>) {
        let schema = self.schema;
        let uses = complex.map_or(&[][..], |c| c.attribute_uses.as_slice());
        let wildcard = complex.and_then(|c| c.attribute_wildcard.as_ref());

        for attribute in node.attributes() {
            let namespace = attribute.namespace();
            let name = clark_name(namespace, attribute.name());
            if namespace == Some(XSI_NAMESPACE) {
                continue;
            }

            match uses.iter().find(|u| u.matches(namespace, attribute.name())) {
                Some(attribute_use) => {
                    let definition = attribute_use.type_definition.get(&schema.components);
                    let value = attribute.value();
                    if let Err(message) = definition.validate(value, &schema.components) {
                        self.attribute_error(node, &name, &message);
                    } else if let Some(ValueConstraint::Fixed(fixed)) = &attribute_use.value_constraint
                    {
                        if !values_match(definition, value, fixed) {
                            self.attribute_error(
                                node,
                                &name,
                                &format!(
                                    "The value '{value}' does not match the fixed value constraint '{fixed}'."
                                ),
                            );
                        }
                    }
                }
                None if wildcard.map_or(false, |w| w.allows(namespace)) => {}
                None => self.attribute_error(
                    node,
                    &name,
                    &format!("The attribute '{name}' is not allowed."),
                ),
            }
        }

        for attribute_use in uses.iter().filter(|u| u.required) {
            let present = node.attributes().any(|a| {
                a.namespace() == attribute_use.namespace.as_deref() && a.name() == attribute_use.name
            });
            if !present {
                let name = clark_name(attribute_use.namespace.as_deref(), &attribute_use.name);
                self.element_error(
                    node,
                    &format!("The attribute '{name}' is required but missing."),
                );
            }
        }
    }
}

fn is_whitespace(text: Option<&str>) -> bool {
    text.map_or(true, |t| t.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\r')))
}

/// Fixed values compare after whitespace normalization.
fn values_match(definition: &SimpleTypeDefinition, value: &str, fixed: &str) -> bool {
    use addenda_builtins::meta::normalized_value;
    normalized_value(value, definition.whitespace) == normalized_value(fixed, definition.whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use addenda_xml::ParseOptions;
    use pretty_assertions::assert_eq;

    #[test]
    fn expected_names_are_listed_once() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:x">
  <xs:element name="a"/>
  <xs:element name="b"/>
</xs:schema>"#;
        let schema = CompiledSchema::compile(xsd, &ParseOptions::default()).unwrap();
        let a = Transition::ElementDeclaration(schema.global_element(Some("urn:x"), "a").unwrap());
        let b = Transition::ElementDeclaration(schema.global_element(Some("urn:x"), "b").unwrap());
        let document = Document::parse("<a/>").unwrap();

        let validator = InstanceValidator::new(&schema, &document);
        assert_eq!(validator.describe(&[b, a, b, a]), vec!["{urn:x}b", "{urn:x}a"]);
        assert_eq!(expected_clause(&validator.describe(&[a, a])), " Expected is ( {urn:x}a ).");
    }
}

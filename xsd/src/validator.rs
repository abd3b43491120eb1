use crate::{
    error::SchemaError,
    info::SchemaInfo,
    report::{ValidationIssue, ValidationOutcome, ValidationReport},
    schema::CompiledSchema,
    suggestions::suggest,
    validation::InstanceValidator,
};
use addenda_xml::{parse_document, ParseOptions, XmlError};

/// A compiled schema, ready to validate any number of documents. Immutable after construction
/// and safe to share between threads.
#[derive(Debug)]
pub struct XsdValidator {
    schema: CompiledSchema,
    info: SchemaInfo,
    options: ParseOptions,
}

impl XsdValidator {
    pub fn new(xsd: &str) -> Result<Self, SchemaError> {
        Self::with_options(xsd, ParseOptions::default())
    }

    /// `options` apply to the schema and to every validated document.
    pub fn with_options(xsd: &str, options: ParseOptions) -> Result<Self, SchemaError> {
        let schema = CompiledSchema::compile(xsd, &options)?;
        let info = SchemaInfo::read(xsd, &options)?;
        Ok(Self {
            schema,
            info,
            options,
        })
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    pub fn validate(&self, xml: &str) -> bool {
        self.validate_with_details(xml).valid
    }

    /// Malformed or oversized input yields an invalid outcome with a single error.
    pub fn validate_with_details(&self, xml: &str) -> ValidationOutcome {
        let warnings = self
            .schema
            .warnings
            .iter()
            .map(|warning| ValidationIssue::new(0, 0, format!("Schema: {warning}")))
            .collect();

        let errors = match parse_document(xml, &self.options) {
            Ok(document) => InstanceValidator::new(&self.schema, &document).run(),
            Err(error) => vec![xml_error_issue(&error)],
        };
        tracing::debug!(errors = errors.len(), "validated document");
        ValidationOutcome::from_issues(errors, warnings)
    }

    pub fn schema_info(&self) -> &SchemaInfo {
        &self.info
    }

    /// Empty exactly when the document is valid.
    pub fn suggest_fixes(&self, xml: &str) -> Vec<String> {
        suggest(self.validate_with_details(xml).error_messages())
    }

    pub fn create_validation_report(&self, xml: &str, include_schema_info: bool) -> ValidationReport {
        let outcome = self.validate_with_details(xml);
        let suggestions = suggest(outcome.error_messages());
        let schema_info = include_schema_info.then(|| self.info.clone());
        ValidationReport::new(outcome, suggestions, schema_info)
    }

    pub fn validate_multiple<S: AsRef<str>>(&self, documents: &[S]) -> Vec<ValidationReport> {
        documents
            .iter()
            .enumerate()
            .map(|(index, xml)| {
                let mut report = self.create_validation_report(xml.as_ref(), false);
                report.document_index = Some(index);
                report
            })
            .collect()
    }
}

fn xml_error_issue(error: &XmlError) -> ValidationIssue {
    match error {
        XmlError::Malformed { line, column, .. } => {
            ValidationIssue::new(*line, *column, format!("Malformed XML: {error}"))
        }
        _ => ValidationIssue::new(0, 0, error.to_string()),
    }
}

/// Outcome of compiling a schema. A schema that failed to compile stays failed: every validation
/// against it is invalid and reports the compile error.
#[derive(Debug)]
pub enum SchemaState {
    Valid(XsdValidator),
    Invalid(SchemaError),
}

impl SchemaState {
    pub fn compile(xsd: &str) -> Self {
        Self::compile_with_options(xsd, ParseOptions::default())
    }

    pub fn compile_with_options(xsd: &str, options: ParseOptions) -> Self {
        match XsdValidator::with_options(xsd, options) {
            Ok(validator) => Self::Valid(validator),
            Err(error) => {
                tracing::warn!(%error, "schema failed to compile");
                Self::Invalid(error)
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn validator(&self) -> Option<&XsdValidator> {
        match self {
            Self::Valid(validator) => Some(validator),
            Self::Invalid(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SchemaError> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(error) => Some(error),
        }
    }

    pub fn validate(&self, xml: &str) -> bool {
        match self {
            Self::Valid(validator) => validator.validate(xml),
            Self::Invalid(_) => false,
        }
    }

    pub fn validate_with_details(&self, xml: &str) -> ValidationOutcome {
        match self {
            Self::Valid(validator) => validator.validate_with_details(xml),
            Self::Invalid(error) => ValidationOutcome::from_issues(
                vec![ValidationIssue::new(
                    error.line(),
                    0,
                    format!("Schema compilation failed: {error}"),
                )],
                Vec::new(),
            ),
        }
    }

    pub fn schema_info(&self) -> Option<&SchemaInfo> {
        self.validator().map(XsdValidator::schema_info)
    }

    pub fn suggest_fixes(&self, xml: &str) -> Vec<String> {
        suggest(self.validate_with_details(xml).error_messages())
    }

    pub fn create_validation_report(&self, xml: &str, include_schema_info: bool) -> ValidationReport {
        match self {
            Self::Valid(validator) => validator.create_validation_report(xml, include_schema_info),
            Self::Invalid(_) => {
                let outcome = self.validate_with_details(xml);
                let suggestions = suggest(outcome.error_messages());
                ValidationReport::new(outcome, suggestions, None)
            }
        }
    }

    pub fn validate_multiple<S: AsRef<str>>(&self, documents: &[S]) -> Vec<ValidationReport> {
        documents
            .iter()
            .enumerate()
            .map(|(index, xml)| {
                let mut report = self.create_validation_report(xml.as_ref(), false);
                report.document_index = Some(index);
                report
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ABC: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="addenda">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="a" type="xs:string"/>
        <xs:element name="b" type="xs:date"/>
        <xs:element name="total" type="xs:decimal"/>
      </xs:sequence>
      <xs:attribute name="version" type="xs:string" use="required"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    fn messages(outcome: &ValidationOutcome) -> Vec<&str> {
        outcome.error_messages().collect()
    }

    #[test]
    fn validator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<XsdValidator>();
        assert_send_sync::<SchemaState>();
    }

    #[test]
    fn missing_last_child_then_fixed() {
        let validator = XsdValidator::new(ABC).unwrap();
        let invalid = r#"<addenda version="1"><a>x</a><b>2024-01-31</b></addenda>"#;
        let outcome = validator.validate_with_details(invalid);
        assert!(!outcome.valid);
        assert_eq!(
            messages(&outcome),
            vec!["Element 'addenda': Missing child element(s). Expected is ( total )."]
        );
        assert_eq!(outcome.errors[0].line, 1);

        let valid = r#"<addenda version="1"><a>x</a><b>2024-01-31</b><total>500.00</total></addenda>"#;
        let outcome = validator.validate_with_details(valid);
        assert!(outcome.valid);
        assert!(outcome.errors.is_empty());
        assert!(validator.suggest_fixes(valid).is_empty());
    }

    #[test]
    fn reports_type_and_attribute_errors() {
        let validator = XsdValidator::new(ABC).unwrap();
        let outcome = validator.validate_with_details(
            "<addenda extra=\"1\">\n  <a>x</a>\n  <b>31/01/2024</b>\n  <total>1,000</total>\n</addenda>",
        );
        assert_eq!(
            messages(&outcome),
            vec![
                "Element 'addenda', attribute 'extra': The attribute 'extra' is not allowed.",
                "Element 'addenda': The attribute 'version' is required but missing.",
                "Element 'b': '31/01/2024' is not a valid value of the atomic type 'xs:date'.",
                "Element 'total': '1,000' is not a valid value of the atomic type 'xs:decimal'.",
            ]
        );
        assert_eq!(outcome.errors[2].line, 3);
    }

    #[test]
    fn unexpected_element() {
        let validator = XsdValidator::new(ABC).unwrap();
        let outcome = validator
            .validate_with_details(r#"<addenda version="1"><b>2024-01-31</b></addenda>"#);
        assert_eq!(
            messages(&outcome),
            vec!["Element 'b': This element is not expected. Expected is ( a )."]
        );
    }

    #[test]
    fn wrong_root_namespace() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:x">
  <xs:element name="addenda" type="xs:string"/>
</xs:schema>"#;
        let validator = XsdValidator::new(xsd).unwrap();
        let outcome = validator.validate_with_details("<addenda>x</addenda>");
        assert_eq!(
            messages(&outcome),
            vec![
                "Element 'addenda': No matching global declaration available for the validation \
                 root. The schema declares 'addenda' in the namespace 'urn:x'."
            ]
        );
        assert!(validator.validate("<addenda xmlns=\"urn:x\">x</addenda>"));
    }

    #[test]
    fn malformed_instance_is_a_single_error() {
        let validator = XsdValidator::new(ABC).unwrap();
        let outcome = validator.validate_with_details("<addenda><a></addenda>");
        assert!(!outcome.valid);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].message.starts_with("Malformed XML:"));
    }

    #[test]
    fn oversized_instance_is_rejected() {
        let validator =
            XsdValidator::with_options(ABC, ParseOptions { max_size: 2048 }).unwrap();
        let outcome = validator.validate_with_details(&"x".repeat(4096));
        assert!(!outcome.valid);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].message.contains("exceeds"));
    }

    #[test]
    fn invalid_schema_state_is_permanent() {
        let state = SchemaState::compile("<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\">");
        assert!(!state.is_valid());
        assert!(!state.validate("<anything/>"));
        assert!(!state.validate("<anything/>"));
        let outcome = state.validate_with_details("<anything/>");
        assert!(outcome.errors[0].message.starts_with("Schema compilation failed"));
        assert!(!state.suggest_fixes("<anything/>").is_empty());
        assert!(state.schema_info().is_none());
    }

    #[test]
    fn report_carries_suggestions_only_when_invalid() {
        let validator = XsdValidator::new(ABC).unwrap();
        let report =
            validator.create_validation_report(r#"<addenda version="1"><a>x</a></addenda>"#, true);
        assert!(!report.valid);
        assert_eq!(report.error_count, 1);
        assert!(report.suggestions.as_ref().is_some_and(|s| !s.is_empty()));
        assert!(report.schema_info.is_some());

        let reports = validator.validate_multiple(&[
            r#"<addenda version="1"><a>x</a><b>2024-01-01</b><total>1</total></addenda>"#,
            "<addenda/>",
        ]);
        assert_eq!(reports.len(), 2);
        assert!(reports[0].valid);
        assert_eq!(reports[0].suggestions, None);
        assert_eq!(reports[1].document_index, Some(1));
        assert!(!reports[1].valid);
    }

    #[test]
    fn facets_on_named_simple_types() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:simpleType name="Currency">
    <xs:restriction base="xs:string">
      <xs:enumeration value="MXN"/>
      <xs:enumeration value="USD"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:simpleType name="Amount">
    <xs:restriction base="xs:decimal">
      <xs:minInclusive value="0"/>
      <xs:fractionDigits value="2"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:element name="pago">
    <xs:complexType>
      <xs:simpleContent>
        <xs:extension base="Amount">
          <xs:attribute name="moneda" type="Currency" default="MXN"/>
        </xs:extension>
      </xs:simpleContent>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;
        let validator = XsdValidator::new(xsd).unwrap();
        assert!(validator.validate(r#"<pago moneda="USD">10.50</pago>"#));
        assert!(validator.validate("<pago>10</pago>"));
        let outcome = validator.validate_with_details(r#"<pago moneda="EUR">-1</pago>"#);
        assert_eq!(
            messages(&outcome),
            vec![
                "Element 'pago', attribute 'moneda': [facet 'enumeration'] The value 'EUR' is not \
                 an element of the set {'MXN', 'USD'}.",
                "Element 'pago': [facet 'minInclusive'] The value '-1' is less than the minimum \
                 value allowed ('0').",
            ]
        );
    }

    fn list_schema(min_occurs: u32, max_occurs: &str) -> String {
        format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="list">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="i" type="xs:int" minOccurs="{min_occurs}" maxOccurs="{max_occurs}"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#
        )
    }

    fn list(items: usize) -> String {
        format!("<list>{}</list>", "<i>1</i>".repeat(items))
    }

    #[test]
    fn occurrence_bounds_are_enforced() {
        for (min_occurs, max_occurs) in [(2, "3"), (200, "250")] {
            let validator = XsdValidator::new(&list_schema(min_occurs, max_occurs)).unwrap();
            let max = max_occurs.parse::<usize>().unwrap();
            let min = min_occurs as usize;

            assert!(validator.validate(&list(min)));
            assert!(validator.validate(&list(max)));

            let outcome = validator.validate_with_details(&list(max + 1));
            assert_eq!(
                messages(&outcome),
                vec!["Element 'i': This element is not expected."]
            );

            let outcome = validator.validate_with_details(&list(min - 1));
            assert_eq!(
                messages(&outcome),
                vec!["Element 'list': Missing child element(s). Expected is ( i )."]
            );
        }
    }

    #[test]
    fn large_maximum_alone_is_enforced() {
        let validator = XsdValidator::new(&list_schema(1, "200")).unwrap();
        assert!(validator.validate(&list(200)));
        let outcome = validator.validate_with_details(&list(250));
        assert_eq!(
            messages(&outcome),
            vec!["Element 'i': This element is not expected."]
        );
    }

    #[test]
    fn large_minimum_alone_is_enforced() {
        let validator = XsdValidator::new(&list_schema(200, "unbounded")).unwrap();
        assert!(validator.validate(&list(1000)));
        let outcome = validator.validate_with_details(&list(150));
        assert_eq!(
            messages(&outcome),
            vec!["Element 'list': Missing child element(s). Expected is ( i )."]
        );
    }

    #[test]
    fn ambiguous_schema_is_rejected() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="r">
    <xs:complexType>
      <xs:choice maxOccurs="unbounded">
        <xs:element name="a" minOccurs="0"/>
        <xs:sequence>
          <xs:element name="a"/>
          <xs:element name="b"/>
        </xs:sequence>
      </xs:choice>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;
        let error = XsdValidator::new(xsd).unwrap_err();
        assert_eq!(
            error.to_string(),
            "the content model of an anonymous complex type is ambiguous: more than one particle \
             can match 'a'"
        );

        let state = SchemaState::compile(xsd);
        assert!(!state.is_valid());
        assert!(!state.validate("<r><a/><b/><a/></r>"));
    }
}


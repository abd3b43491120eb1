use addenda::{
    cfdi::CfdiParser,
    template::{ContextBuilder, Resolver, TemplateRenderer},
    xsd::XsdValidator,
    AddendaConfig, AddendaGenerator, AddendaTemplate, AddendaType, FieldDefinition,
    GenerationError, GenerationRequest, ValidationPolicy,
};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

const CFDI: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cfdi:Comprobante xmlns:cfdi="http://www.sat.gob.mx/cfd/4" xmlns:tfd="http://www.sat.gob.mx/TimbreFiscalDigital" Version="4.0" Folio="123" Total="500.00" SubTotal="431.03">
  <cfdi:Emisor Rfc="AAA010101AAA"/>
  <cfdi:Receptor Rfc="XAXX010101000"/>
  <cfdi:Conceptos>
    <cfdi:Concepto Descripcion="Tornillo" Importe="300.00"/>
    <cfdi:Concepto Descripcion="Tuerca" Importe="131.03"/>
  </cfdi:Conceptos>
  <cfdi:Complemento>
    <tfd:TimbreFiscalDigital Version="1.1" UUID="ABC-123"/>
  </cfdi:Complemento>
</cfdi:Comprobante>"#;

const CFDI_WITHOUT_COMPLEMENTO: &str = r#"<cfdi:Comprobante xmlns:cfdi="http://www.sat.gob.mx/cfd/4" Version="4.0"><cfdi:Emisor Rfc="AAA010101AAA"/><cfdi:Receptor Rfc="XAXX010101000"/><cfdi:Conceptos><cfdi:Concepto Importe="1"/></cfdi:Conceptos><cfdi:Impuestos/></cfdi:Comprobante>"#;

const NAMESPACE: &str = "urn:demo:addenda";

const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
    targetNamespace="urn:demo:addenda" elementFormDefault="qualified">
  <xs:element name="addenda">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="folio" type="xs:string"/>
        <xs:element name="orden" type="xs:string" minOccurs="0"/>
        <xs:element name="total" type="xs:decimal"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

fn addenda_type() -> AddendaType {
    AddendaType {
        id: "demo".to_string(),
        name: "Demo".to_string(),
        namespace: Some(NAMESPACE.to_string()),
        xsd_schema: Some(SCHEMA.to_string()),
        version: "1.0".to_string(),
        fields: vec![FieldDefinition {
            name: "orden".to_string(),
            required: true,
            description: None,
            default: Some("PO-1".to_string()),
        }],
    }
}

fn template(content: &str) -> AddendaTemplate {
    AddendaTemplate {
        name: "demo".to_string(),
        addenda_type: "demo".to_string(),
        content: content.to_string(),
        is_default: true,
    }
}

fn generator(policy: ValidationPolicy) -> AddendaGenerator {
    let mut config = AddendaConfig::default();
    config.validation.policy = policy;
    AddendaGenerator::new(config)
}

fn child_names(xml: &str) -> Vec<String> {
    let document = CfdiParser::default().parse(xml).unwrap();
    document
        .root()
        .child_elements()
        .map(|e| e.local_name().to_string())
        .collect()
}

#[test]
fn cfdi_layer_wins() {
    let context = ContextBuilder::new()
        .system("x", "sys")
        .field("x", "field")
        .cfdi("x", "cfdi")
        .build();
    let xml = TemplateRenderer::default()
        .render("<a>{{ x }}</a>", &context)
        .unwrap();
    assert_eq!(xml, "<a>cfdi</a>");
}

#[test]
fn renders_from_extracted_cfdi_data() {
    let document = CfdiParser::default().parse(CFDI).unwrap();
    let context = ContextBuilder::new()
        .cfdi_data(document.extract_data())
        .build();
    let xml = TemplateRenderer::new(Resolver::default())
        .render(
            "<addenda><folio>{{ cfdi_uuid }}</folio><total>{{ cfdi_total }}</total></addenda>",
            &context,
        )
        .unwrap();
    assert_eq!(xml, "<addenda><folio>ABC-123</folio><total>500.00</total></addenda>");
}

#[test]
fn insertion_follows_complemento_then_conceptos() {
    let parser = CfdiParser::default();

    let xml = parser.insert(CFDI, "<addenda/>").unwrap();
    assert_eq!(
        child_names(&xml),
        vec!["Emisor", "Receptor", "Conceptos", "Complemento", "Addenda"]
    );

    let xml = parser
        .insert(CFDI_WITHOUT_COMPLEMENTO, "<addenda/>")
        .unwrap();
    assert_eq!(
        child_names(&xml),
        vec!["Emisor", "Receptor", "Conceptos", "Addenda", "Impuestos"]
    );
    assert!(xml.contains("<cfdi:Addenda>"), "{xml}");
}

#[test]
fn missing_total_is_reported_with_a_suggestion() {
    let validator = XsdValidator::new(SCHEMA).unwrap();
    let xml = format!(r#"<addenda xmlns="{NAMESPACE}"><folio>ABC-123</folio></addenda>"#);

    let report = validator.create_validation_report(&xml, false);
    assert!(!report.valid);
    assert!(report.errors.iter().any(|e| e.message.contains("total")));
    let suggestions = report.suggestions.unwrap();
    assert!(suggestions.iter().any(|s| s.contains("<total>")), "{suggestions:?}");
}

#[test]
fn suggestions_exist_exactly_when_invalid() {
    let validator = XsdValidator::new(SCHEMA).unwrap();
    let documents = [
        format!(r#"<addenda xmlns="{NAMESPACE}"><folio>1</folio><total>2</total></addenda>"#),
        format!(r#"<addenda xmlns="{NAMESPACE}"><folio>1</folio></addenda>"#),
        format!(r#"<addenda xmlns="{NAMESPACE}"><total>x</total></addenda>"#),
        "<addenda><folio>".to_string(),
    ];
    for document in &documents {
        assert_eq!(
            validator.validate(document),
            validator.suggest_fixes(document).is_empty(),
            "{document}"
        );
    }
}

#[test]
fn generates_a_valid_addenda() {
    let addenda_type = addenda_type();
    let template = template(
        "<addenda><folio>{{ cfdi_uuid }}</folio><orden>{{ orden }}</orden><total>{{ cfdi_total }}</total></addenda>",
    );
    let now = NaiveDate::from_ymd_opt(2024, 2, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let request = GenerationRequest::new(CFDI, &addenda_type, &template).at(now);

    let outcome = generator(ValidationPolicy::Enforce).generate(&request).unwrap();
    assert_eq!(
        outcome.addenda_xml,
        format!(
            r#"<addenda xmlns="{NAMESPACE}"><folio>ABC-123</folio><orden>PO-1</orden><total>500.00</total></addenda>"#
        )
    );
    assert!(outcome.report.unwrap().valid);
    assert!(outcome.missing_fields.is_empty());
    assert_eq!(
        child_names(&outcome.cfdi_xml),
        vec!["Emisor", "Receptor", "Conceptos", "Complemento", "Addenda"]
    );
}

#[test]
fn configured_fields_override_defaults() {
    let addenda_type = addenda_type();
    let template = template("<addenda><folio>{{ orden }}</folio><total>1</total></addenda>");
    let fields = BTreeMap::from([("orden".to_string(), "PO-99".to_string())]);
    let request = GenerationRequest::new(CFDI, &addenda_type, &template).with_fields(fields);

    let outcome = generator(ValidationPolicy::Skip).generate(&request).unwrap();
    assert!(outcome.addenda_xml.contains("<folio>PO-99</folio>"));
    assert_eq!(outcome.report, None);
}

#[test]
fn report_policy_keeps_invalid_addendas() {
    let addenda_type = addenda_type();
    let template = template("<addenda><folio>{{ cfdi_uuid }}</folio></addenda>");
    let request = GenerationRequest::new(CFDI, &addenda_type, &template);

    let outcome = generator(ValidationPolicy::Report).generate(&request).unwrap();
    let report = outcome.report.unwrap();
    assert!(!report.valid);
    assert!(report.suggestions.is_some());
    assert!(outcome.cfdi_xml.contains("ABC-123</folio>"));

    let error = generator(ValidationPolicy::Enforce)
        .generate(&request)
        .unwrap_err();
    assert!(matches!(error, GenerationError::SchemaViolation(report) if !report.valid));
}

#[test]
fn empty_render_is_an_error() {
    let addenda_type = addenda_type();
    let template = template("   ");
    let request = GenerationRequest::new(CFDI, &addenda_type, &template);
    assert!(matches!(
        generator(ValidationPolicy::Skip).generate(&request),
        Err(GenerationError::EmptyAddenda)
    ));
}

#[test]
fn structurally_invalid_cfdi_is_rejected() {
    let addenda_type = addenda_type();
    let template = template("<addenda/>");
    let cfdi = r#"<cfdi:Comprobante xmlns:cfdi="http://www.sat.gob.mx/cfd/4" Version="4.0"/>"#;
    let request = GenerationRequest::new(cfdi, &addenda_type, &template);
    assert!(matches!(
        generator(ValidationPolicy::Skip).generate(&request),
        Err(GenerationError::Cfdi(_))
    ));
}

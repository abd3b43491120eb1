//! Render, validate, insert.
use crate::{
    config::{AddendaConfig, ValidationPolicy},
    error::GenerationError,
    model::{AddendaTemplate, AddendaType},
};
use addenda_cfdi::CfdiParser;
use addenda_template::{ContextBuilder, ResolveMode, Resolver, TemplateRenderer, VariableContext};
use addenda_xsd::{SchemaError, ValidationReport, XsdValidator};
use chrono::{Local, NaiveDateTime};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub cfdi_xml: &'a str,
    pub addenda_type: &'a AddendaType,
    pub template: &'a AddendaTemplate,
    /// Configured field values, already resolved.
    pub fields: BTreeMap<String, String>,
    /// The time system variables are computed from; the local time when `None`.
    pub now: Option<NaiveDateTime>,
}

impl<'a> GenerationRequest<'a> {
    pub fn new(
        cfdi_xml: &'a str,
        addenda_type: &'a AddendaType,
        template: &'a AddendaTemplate,
    ) -> Self {
        Self {
            cfdi_xml,
            addenda_type,
            template,
            fields: BTreeMap::new(),
            now: None,
        }
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, String>) -> Self {
        self.fields = fields;
        self
    }

    pub fn at(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub addenda_xml: String,
    pub cfdi_xml: String,
    /// `None` when the policy is [`ValidationPolicy::Skip`] or the type has no schema.
    pub report: Option<ValidationReport>,
    /// Required fields that rendered empty; only non-empty in lenient mode.
    pub missing_fields: Vec<String>,
}

/// Clones share the compiled schemas.
#[derive(Debug, Clone, Default)]
pub struct AddendaGenerator {
    config: AddendaConfig,
    parser: CfdiParser,
    /// Compiled validators keyed by schema text.
    validators: Arc<Mutex<HashMap<String, Arc<XsdValidator>>>>,
}

impl AddendaGenerator {
    pub fn new(config: AddendaConfig) -> Self {
        let parser = CfdiParser::new(config.parser.clone());
        Self {
            config,
            parser,
            validators: Arc::default(),
        }
    }

    pub fn config(&self) -> &AddendaConfig {
        &self.config
    }

    /// The variable context a request renders against: system time, field defaults overlaid by
    /// configured values, then the CFDI data with its line items.
    pub fn context(&self, request: &GenerationRequest) -> Result<VariableContext, GenerationError> {
        let document = self.parser.parse(request.cfdi_xml)?;
        self.build_context(request, &document)
    }

    fn build_context(
        &self,
        request: &GenerationRequest,
        document: &addenda_cfdi::CfdiDocument,
    ) -> Result<VariableContext, GenerationError> {
        let now = request.now.unwrap_or_else(|| Local::now().naive_local());
        let conceptos = serde_json::to_value(document.line_items())?;
        Ok(ContextBuilder::new()
            .system_time(now)
            .fields(request.addenda_type.defaults())
            .fields(request.fields.clone())
            .cfdi_data(document.extract_data())
            .conceptos(conceptos)
            .build())
    }

    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome, GenerationError> {
        let document = if self.config.validate_structure {
            self.parser.parse_validated(request.cfdi_xml)?
        } else {
            self.parser.parse(request.cfdi_xml)?
        };
        let context = self.build_context(request, &document)?;

        let addenda_type = request.addenda_type;
        let mut renderer = TemplateRenderer::new(Resolver::new(self.config.render.mode))
            .with_parse_options(self.config.parser.parse_options());
        if let Some(namespace) = &addenda_type.namespace {
            renderer = renderer.with_namespace(namespace.as_str());
        }
        let addenda_xml = renderer.render(&request.template.content, &context)?;
        if addenda_xml.is_empty() {
            return Err(GenerationError::EmptyAddenda);
        }
        tracing::debug!(
            addenda_type = %addenda_type.id,
            template = %request.template.name,
            "rendered addenda"
        );

        let missing_fields = addenda_type.missing_required_fields(&context);
        if !missing_fields.is_empty() {
            match self.config.render.mode {
                ResolveMode::Strict => return Err(GenerationError::MissingFields(missing_fields)),
                ResolveMode::Lenient => tracing::warn!(
                    fields = %missing_fields.join(", "),
                    "required fields without a value"
                ),
            }
        }

        let report = self.validate(addenda_type, &addenda_xml)?;

        let cfdi_xml = document.insert_addenda(&addenda_xml)?;
        Ok(GenerationOutcome {
            addenda_xml,
            cfdi_xml,
            report,
            missing_fields,
        })
    }

    fn validate(
        &self,
        addenda_type: &AddendaType,
        addenda_xml: &str,
    ) -> Result<Option<ValidationReport>, GenerationError> {
        let policy = self.config.validation.policy;
        let schema = match (&addenda_type.xsd_schema, policy) {
            (_, ValidationPolicy::Skip) | (None, _) => return Ok(None),
            (Some(schema), _) => schema,
        };

        let validator = self.validator(schema)?;
        let report = validator.create_validation_report(addenda_xml, false);
        if !report.valid {
            tracing::warn!(
                addenda_type = %addenda_type.id,
                errors = report.error_count,
                "addenda does not satisfy its schema"
            );
            if policy == ValidationPolicy::Enforce {
                return Err(GenerationError::SchemaViolation(Box::new(report)));
            }
        }
        Ok(Some(report))
    }

    /// Compiles `schema` on first use.
    fn validator(&self, schema: &str) -> Result<Arc<XsdValidator>, SchemaError> {
        let mut validators = self
            .validators
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(validator) = validators.get(schema) {
            return Ok(Arc::clone(validator));
        }
        let validator = Arc::new(XsdValidator::with_options(
            schema,
            self.config.parser.parse_options(),
        )?);
        tracing::debug!(schemas = validators.len() + 1, "compiled addenda schema");
        validators.insert(schema.to_string(), Arc::clone(&validator));
        Ok(validator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="addenda" type="xs:string"/>
</xs:schema>"#;

    #[test]
    fn schemas_are_compiled_once() {
        let generator = AddendaGenerator::default();
        let shared = generator.clone();

        let first = generator.validator(SCHEMA).unwrap();
        let second = shared.validator(SCHEMA).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.validate("<addenda>x</addenda>"));

        let other = generator
            .validator(&SCHEMA.replace("xs:string", "xs:int"))
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(generator.validators.lock().unwrap().len(), 2);
    }

    #[test]
    fn invalid_schemas_are_not_cached() {
        let generator = AddendaGenerator::default();
        assert!(generator.validator("<xs:schema").is_err());
        assert!(generator.validators.lock().unwrap().is_empty());
    }
}

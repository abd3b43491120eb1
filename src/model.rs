//! Records handed over by the storage layer. They are plain data; nothing here fetches them.
use crate::error::ModelError;
use addenda_template::{display_value, format, FormatSpec, VariableContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Used when no configured value exists.
    #[serde(default)]
    pub default: Option<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// A kind of addenda a customer requires. Not modified once a template references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddendaType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub xsd_schema: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl AddendaType {
    /// Names of required fields that resolve to nothing in `context`, in declaration order.
    pub fn missing_required_fields(&self, context: &VariableContext) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .filter(|f| {
                context
                    .get(&f.name)
                    .map_or(true, |v| display_value(v).trim().is_empty())
            })
            .map(|f| f.name.clone())
            .collect()
    }

    /// Field defaults by name.
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.fields
            .iter()
            .filter_map(|f| Some((f.name.as_str(), f.default.as_deref()?)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddendaTemplate {
    pub name: String,
    /// Id of the [`AddendaType`] the template belongs to.
    pub addenda_type: String,
    pub content: String,
    #[serde(default)]
    pub is_default: bool,
}

/// The default template of a type, or its only template.
pub fn select_template<'t>(
    templates: &'t [AddendaTemplate],
    type_id: &str,
) -> Result<&'t AddendaTemplate, ModelError> {
    let candidates = templates
        .iter()
        .filter(|t| t.addenda_type == type_id)
        .collect::<Vec<_>>();
    let defaults = candidates
        .iter()
        .copied()
        .filter(|t| t.is_default)
        .collect::<Vec<_>>();

    match (defaults.as_slice(), candidates.as_slice()) {
        ([template], _) => Ok(*template),
        ([], [only]) => Ok(*only),
        ([], _) => Err(ModelError::NoTemplate(type_id.to_string())),
        _ => Err(ModelError::MultipleDefaults(type_id.to_string())),
    }
}

/// Looks up the attribute of a source object for a dynamic field. Implemented by the caller.
pub trait DynamicSource {
    fn lookup(&self, source: &str, field: &str) -> Option<String>;
}

impl<F> DynamicSource for F
where
    F: Fn(&str, &str) -> Option<String>,
{
    fn lookup(&self, source: &str, field: &str) -> Option<String> {
        self(source, field)
    }
}

/// Source name to field to value.
impl DynamicSource for BTreeMap<String, BTreeMap<String, String>> {
    fn lookup(&self, source: &str, field: &str) -> Option<String> {
        self.get(source)?.get(field).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicField {
    pub source: String,
    pub field: String,
    /// Any format accepted after `|` in a template.
    #[serde(default)]
    pub transformation: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
}

/// A plain string is a static value; a table is a dynamic field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSource {
    Static(String),
    Dynamic(DynamicField),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: String,
    pub value: FieldSource,
}

impl FieldValue {
    pub fn resolve(&self, source: &dyn DynamicSource) -> String {
        match &self.value {
            FieldSource::Static(value) => value.clone(),
            FieldSource::Dynamic(dynamic) => {
                match source
                    .lookup(&dynamic.source, &dynamic.field)
                    .filter(|v| !v.is_empty())
                {
                    Some(value) => match &dynamic.transformation {
                        Some(spec) => format::apply(&FormatSpec::parse(spec), &value),
                        None => value,
                    },
                    None => {
                        tracing::debug!(
                            field = %self.name,
                            source = %dynamic.source,
                            "dynamic field falls back to its default"
                        );
                        dynamic.default.clone().unwrap_or_default()
                    }
                }
            }
        }
    }
}

/// Per-customer field values for one addenda type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddendaConfiguration {
    pub addenda_type: String,
    #[serde(default)]
    pub fields: Vec<FieldValue>,
}

impl AddendaConfiguration {
    pub fn field_values(&self, source: &dyn DynamicSource) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.resolve(source)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use addenda_template::ContextBuilder;
    use pretty_assertions::assert_eq;

    fn template(name: &str, addenda_type: &str, is_default: bool) -> AddendaTemplate {
        AddendaTemplate {
            name: name.to_string(),
            addenda_type: addenda_type.to_string(),
            content: "<a/>".to_string(),
            is_default,
        }
    }

    #[test]
    fn template_selection() {
        let templates = vec![
            template("a1", "a", false),
            template("a2", "a", true),
            template("b1", "b", false),
            template("c1", "c", true),
            template("c2", "c", true),
            template("d1", "d", false),
            template("d2", "d", false),
        ];
        assert_eq!(select_template(&templates, "a").unwrap().name, "a2");
        assert_eq!(select_template(&templates, "b").unwrap().name, "b1");
        assert_eq!(
            select_template(&templates, "c"),
            Err(ModelError::MultipleDefaults("c".to_string()))
        );
        assert_eq!(
            select_template(&templates, "d"),
            Err(ModelError::NoTemplate("d".to_string()))
        );
        assert_eq!(
            select_template(&templates, "z"),
            Err(ModelError::NoTemplate("z".to_string()))
        );
    }

    #[test]
    fn missing_required_fields() {
        let addenda_type: AddendaType = serde_json::from_str(
            r#"{"id": "t", "name": "T", "fields": [
                {"name": "orden", "required": true},
                {"name": "proveedor", "required": true},
                {"name": "nota"},
                {"name": "almacen", "required": true}
            ]}"#,
        )
        .unwrap();
        assert_eq!(addenda_type.version, "1.0");
        let context = ContextBuilder::new()
            .field("orden", "4500012345")
            .field("almacen", "  ")
            .build();
        assert_eq!(
            addenda_type.missing_required_fields(&context),
            vec!["proveedor", "almacen"]
        );
    }

    #[test]
    fn field_sources() {
        let fields: Vec<FieldValue> = serde_json::from_str(
            r#"[
                {"name": "orden", "value": "4500012345"},
                {"name": "cliente", "value": {"source": "customer", "field": "name", "transformation": "uppercase"}},
                {"name": "correo", "value": {"source": "customer", "field": "email", "default": "sin correo"}}
            ]"#,
        )
        .unwrap();
        let configuration = AddendaConfiguration {
            addenda_type: "t".to_string(),
            fields,
        };
        let source = |source: &str, field: &str| {
            (source == "customer" && field == "name").then(|| "acme sa".to_string())
        };
        let values = configuration.field_values(&source);
        assert_eq!(values["orden"], "4500012345");
        assert_eq!(values["cliente"], "ACME SA");
        assert_eq!(values["correo"], "sin correo");
    }
}

use crate::{
    complex_type_def::ComplexTypeDefinition,
    error::SchemaError,
    mapping_context::MappingContext,
    state_machine::ContentModel,
    values::schema_children,
    xstypes::QName,
    ElementDeclaration, Ref, SchemaComponentTable, XS_NAMESPACE,
};
use addenda_xml::{parse_document, ParseOptions};
use std::collections::HashMap;

/// A schema document compiled into components, with the content model of every complex type
/// that has element content.
#[derive(Debug)]
pub struct CompiledSchema {
    pub components: SchemaComponentTable,
    pub target_namespace: Option<String>,
    /// Top-level element declarations in document order.
    pub global_elements: Vec<Ref<ElementDeclaration>>,
    /// Constructs that were skipped.
    pub warnings: Vec<String>,
    content_models: HashMap<Ref<ComplexTypeDefinition>, ContentModel>,
}

impl CompiledSchema {
    /// Compiles a single schema document. `xs:import` and `xs:include` are not followed.
    pub fn compile(source: &str, options: &ParseOptions) -> Result<Self, SchemaError> {
        let document = parse_document(source, options)?;
        let root = document.root_element();
        if root.tag_name().namespace() != Some(XS_NAMESPACE) || root.tag_name().name() != "schema"
        {
            return Err(SchemaError::NotASchema(root.tag_name().name().to_string()));
        }

        let mut context = MappingContext::new(root)?;

        let mut global_elements = Vec::new();
        for child in schema_children(root).filter(|c| c.tag_name().name() == "element") {
            if let Some(name) = child.attribute("name") {
                let name = QName::with_optional_namespace(context.target_namespace.clone(), name);
                global_elements.push(context.resolve_element(&name)?);
            }
        }

        // Unreferenced named components are mapped too, so errors in them surface here.
        let names = context.top_level_names();
        for name in &names.types {
            context.resolve_type(name)?;
        }
        for name in &names.groups {
            context.resolve_group(name)?;
        }
        for name in &names.attribute_groups {
            context.resolve_attribute_group(name)?;
        }

        let target_namespace = context.target_namespace.clone();
        let warnings = std::mem::take(&mut context.warnings);
        let components = context
            .components
            .convert_to_schema_table()
            .ok_or_else(|| SchemaError::Circular("a component".to_string()))?;

        let mut content_models = HashMap::new();
        for complex in components.complex_type_refs() {
            let definition = complex.get(&components);
            if let Some(particle) = definition.content_type.particle() {
                let owner = match &definition.name {
                    Some(name) => format!("type {name}"),
                    None => "an anonymous complex type".to_string(),
                };
                let model = ContentModel::build(particle, &components, &owner)?;
                content_models.insert(complex, model);
            }
        }

        tracing::debug!(
            target_namespace = target_namespace.as_deref().unwrap_or(""),
            elements = global_elements.len(),
            warnings = warnings.len(),
            "compiled schema"
        );

        Ok(Self {
            components,
            target_namespace,
            global_elements,
            warnings,
            content_models,
        })
    }

    pub fn global_element(
        &self,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Option<Ref<ElementDeclaration>> {
        self.global_elements.iter().copied().find(|e| {
            let e = e.get(&self.components);
            e.name == local_name && e.target_namespace.as_deref() == namespace
        })
    }

    /// A top-level element with this local name in any namespace.
    pub fn global_element_by_local_name(&self, local_name: &str) -> Option<Ref<ElementDeclaration>> {
        self.global_elements
            .iter()
            .copied()
            .find(|e| e.get(&self.components).name == local_name)
    }

    pub fn content_model(&self, complex: Ref<ComplexTypeDefinition>) -> Option<&ContentModel> {
        self.content_models.get(&complex)
    }
}

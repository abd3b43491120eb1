use crate::{
    components::Component,
    error::SchemaError,
    mapping_context::MappingContext,
    shared::{TypeDefinition, ValueConstraint},
    values::{actual_value, required_value, schema_children, unexpected_child},
    xstypes::QName,
    Ref,
};
use roxmltree::Node;

/// Schema Component: Element Declaration, a kind of Term (§3.3)
#[derive(Clone, Debug)]
pub struct ElementDeclaration {
    pub name: String,
    pub target_namespace: Option<String>,
    pub type_definition: TypeDefinition,
    pub nillable: bool,
    pub value_constraint: Option<ValueConstraint>,
    pub abstract_: bool,
    pub scope: Scope,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    Global,
    Local,
}

impl Component for ElementDeclaration {
    const DISPLAY_NAME: &'static str = "ElementDeclaration";
}

impl ElementDeclaration {
    pub fn qname(&self) -> QName {
        QName::with_optional_namespace(self.target_namespace.clone(), self.name.clone())
    }

    /// Top-level `<xs:element>` (§3.3.2.1)
    pub(crate) fn map_global<'a, 'input>(
        context: &mut MappingContext<'a, 'input>,
        element: Node<'a, 'input>,
    ) -> Result<Self, SchemaError> {
        let name = required_value::<String>(element, "name")?;
        let target_namespace = context.target_namespace.clone();
        Self::map_declaration(context, element, name, target_namespace, Scope::Global)
    }

    /// `<xs:element>` inside a model group: either a reference to a top-level declaration
    /// (§3.3.2.3) or a local declaration (§3.3.2.2).
    pub(crate) fn map_particle_term<'a, 'input>(
        context: &mut MappingContext<'a, 'input>,
        element: Node<'a, 'input>,
    ) -> Result<Ref<Self>, SchemaError> {
        if let Some(ref_) = actual_value::<QName>(element, "ref")? {
            return context.resolve_element(&ref_);
        }

        let name = required_value::<String>(element, "name")?;
        let qualified = match actual_value::<&str>(element, "form")? {
            Some("qualified") => true,
            Some("unqualified") => false,
            Some(other) => {
                return Err(SchemaError::InvalidAttribute {
                    element: "element".to_string(),
                    attribute: "form",
                    value: other.to_string(),
                })
            }
            None => context.element_form_qualified,
        };
        let target_namespace = if qualified {
            context.target_namespace.clone()
        } else {
            None
        };

        let declaration =
            Self::map_declaration(context, element, name, target_namespace, Scope::Local)?;
        Ok(context.components.create(declaration))
    }

    fn map_declaration<'a, 'input>(
        context: &mut MappingContext<'a, 'input>,
        element: Node<'a, 'input>,
        name: String,
        target_namespace: Option<String>,
        scope: Scope,
    ) -> Result<Self, SchemaError> {
        let mut type_definition = match actual_value::<QName>(element, "type")? {
            Some(type_name) => Some(context.resolve_type(&type_name)?),
            None => None,
        };

        for child in schema_children(element) {
            match child.tag_name().name() {
                "simpleType" | "complexType" if type_definition.is_none() => {
                    type_definition = Some(context.map_anonymous_type(child)?);
                }
                "unique" | "key" | "keyref" => context.warn(format!(
                    "identity constraint <xs:{}> on element {name:?} is not enforced",
                    child.tag_name().name()
                )),
                _ => return Err(unexpected_child(element, child)),
            }
        }

        // Without a type, the element's type is the ur-type (§3.3.2.1)
        let type_definition =
            type_definition.unwrap_or_else(|| TypeDefinition::Complex(context.any_type()));

        Ok(Self {
            name,
            target_namespace,
            type_definition,
            nillable: actual_value(element, "nillable")?.unwrap_or(false),
            value_constraint: ValueConstraint::map_from_xml(element)?,
            abstract_: actual_value(element, "abstract")?.unwrap_or(false),
            scope,
        })
    }
}

use crate::{
    error::SchemaError,
    mapping_context::MappingContext,
    shared::ValueConstraint,
    values::{actual_value, required_value, schema_children, unexpected_child},
    xstypes::QName,
    Ref, SimpleTypeDefinition, Wildcard,
};
use addenda_builtins::BuiltinType;
use roxmltree::Node;

/// Schema Component: Attribute Use (§3.5), with the declaration's properties folded in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeUse {
    pub name: String,
    pub namespace: Option<String>,
    pub required: bool,
    pub type_definition: Ref<SimpleTypeDefinition>,
    pub value_constraint: Option<ValueConstraint>,
}

impl AttributeUse {
    pub fn matches(&self, namespace: Option<&str>, name: &str) -> bool {
        self.namespace.as_deref() == namespace && self.name == name
    }
}

/// Attribute uses declared directly on a complex type, a derivation, or an attribute group.
#[derive(Clone, Debug, Default)]
pub(crate) struct AttributeSet {
    pub uses: Vec<AttributeUse>,
    /// `use="prohibited"` entries, removed from what a restriction inherits.
    pub prohibited: Vec<(Option<String>, String)>,
    pub wildcard: Option<Wildcard>,
}

impl AttributeSet {
    /// Maps the `<xs:attribute>`, `<xs:attributeGroup>` and `<xs:anyAttribute>` children of
    /// `parent`; other children are left to the caller.
    pub(crate) fn map_children<'a, 'input>(
        context: &mut MappingContext<'a, 'input>,
        parent: Node<'a, 'input>,
    ) -> Result<Self, SchemaError> {
        let mut set = Self::default();
        for child in schema_children(parent) {
            match child.tag_name().name() {
                "attribute" => match map_attribute(context, child)? {
                    Mapped::Use(attribute_use) => set.add(attribute_use),
                    Mapped::Prohibited(namespace, name) => set.prohibited.push((namespace, name)),
                },
                "attributeGroup" => {
                    let name = required_value::<QName>(child, "ref")?;
                    let group = context.resolve_attribute_group(&name)?;
                    for attribute_use in group.uses {
                        set.add(attribute_use);
                    }
                    set.prohibited.extend(group.prohibited);
                    if set.wildcard.is_none() {
                        set.wildcard = group.wildcard;
                    }
                }
                "anyAttribute" => set.wildcard = Some(Wildcard::map_from_xml(context, child)?),
                _ => {}
            }
        }
        Ok(set)
    }

    /// Adds or replaces (by expanded name) an attribute use.
    pub(crate) fn add(&mut self, attribute_use: AttributeUse) {
        match self
            .uses
            .iter_mut()
            .find(|u| u.matches(attribute_use.namespace.as_deref(), &attribute_use.name))
        {
            Some(existing) => *existing = attribute_use,
            None => self.uses.push(attribute_use),
        }
    }

    /// Inherited uses first, then this set's uses and prohibitions on top.
    pub(crate) fn derive_from(self, base: &[AttributeUse]) -> Vec<AttributeUse> {
        let mut merged = AttributeSet {
            uses: base.to_vec(),
            ..Default::default()
        };
        for attribute_use in self.uses {
            merged.add(attribute_use);
        }
        merged
            .uses
            .retain(|u| !self.prohibited.iter().any(|(ns, name)| u.matches(ns.as_deref(), name)));
        merged.uses
    }
}

enum Mapped {
    Use(AttributeUse),
    Prohibited(Option<String>, String),
}

fn map_attribute<'a, 'input>(
    context: &mut MappingContext<'a, 'input>,
    attribute: Node<'a, 'input>,
) -> Result<Mapped, SchemaError> {
    let use_ = actual_value::<&str>(attribute, "use")?.unwrap_or("optional");
    let required = match use_ {
        "optional" => false,
        "required" => true,
        "prohibited" => false,
        other => {
            return Err(SchemaError::InvalidAttribute {
                element: "attribute".to_string(),
                attribute: "use",
                value: other.to_string(),
            })
        }
    };

    // A reference takes name, namespace and type from the top-level declaration (§3.2.2.2)
    let (declaration, name, namespace) = match actual_value::<QName>(attribute, "ref")? {
        Some(ref_) => {
            let declaration = context.global_attribute(&ref_)?;
            (declaration, ref_.local_name, ref_.namespace_name)
        }
        None => {
            let name = required_value::<String>(attribute, "name")?;
            let qualified = match actual_value::<&str>(attribute, "form")? {
                Some(form) => form == "qualified",
                None => context.attribute_form_qualified,
            };
            let is_global = attribute
                .parent_element()
                .map_or(false, |p| p.tag_name().name() == "schema");
            let namespace = if qualified || is_global {
                context.target_namespace.clone()
            } else {
                None
            };
            (attribute, name, namespace)
        }
    };

    if use_ == "prohibited" {
        return Ok(Mapped::Prohibited(namespace, name));
    }

    let mut type_definition = actual_value::<QName>(declaration, "type")?
        .map(|type_name| context.resolve_simple_type(&type_name))
        .transpose()?;
    for child in schema_children(declaration) {
        match child.tag_name().name() {
            "simpleType" if type_definition.is_none() => {
                let definition = SimpleTypeDefinition::map_from_xml(context, child, None)?;
                type_definition = Some(context.components.create(definition));
            }
            _ => return Err(unexpected_child(declaration, child)),
        }
    }
    let type_definition =
        type_definition.unwrap_or_else(|| context.builtin(BuiltinType::AnySimpleType));

    let value_constraint = match ValueConstraint::map_from_xml(attribute)? {
        Some(constraint) => Some(constraint),
        None => ValueConstraint::map_from_xml(declaration)?,
    };

    Ok(Mapped::Use(AttributeUse {
        name,
        namespace,
        required,
        type_definition,
        value_constraint,
    }))
}

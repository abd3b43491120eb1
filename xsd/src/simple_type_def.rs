use crate::{
    components::{Component, ComponentTable},
    constraining_facet::ConstrainingFacet,
    error::SchemaError,
    mapping_context::MappingContext,
    values::{actual_value, schema_children, unexpected_child},
    xstypes::QName,
    Ref,
};
use addenda_builtins::{
    meta::{normalized_value, Whitespace},
    BuiltinType,
};
use roxmltree::Node;

/// Schema Component: Simple Type Definition, a kind of Type Definition (pt. 2, §4.1)
#[derive(Clone, Debug)]
pub struct SimpleTypeDefinition {
    pub name: Option<QName>,
    pub variety: Variety,
    /// Every facet along the derivation chain; all of them apply.
    pub facets: Vec<ConstrainingFacet>,
    pub whitespace: Whitespace,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Variety {
    /// Atomic types keep the built-in they ultimately derive from, which decides the lexical
    /// space.
    Atomic(BuiltinType),
    List(Ref<SimpleTypeDefinition>),
    Union(Vec<Ref<SimpleTypeDefinition>>),
}

impl Component for SimpleTypeDefinition {
    const DISPLAY_NAME: &'static str = "SimpleTypeDefinition";
}

impl SimpleTypeDefinition {
    pub(crate) fn builtin(builtin: BuiltinType) -> Self {
        Self {
            name: Some(QName::with_namespace(crate::XS_NAMESPACE, builtin.name())),
            variety: Variety::Atomic(builtin),
            facets: Vec::new(),
            whitespace: builtin.whitespace(),
        }
    }

    /// Maps a `<xs:simpleType>` element. `name` is `None` for anonymous definitions.
    pub(crate) fn map_from_xml<'a, 'input>(
        context: &mut MappingContext<'a, 'input>,
        simple_type: Node<'a, 'input>,
        name: Option<QName>,
    ) -> Result<Self, SchemaError> {
        let derivation = schema_children(simple_type)
            .next()
            .ok_or_else(|| SchemaError::MissingAttribute {
                element: "simpleType".to_string(),
                attribute: "restriction|list|union",
            })?;

        match derivation.tag_name().name() {
            "restriction" => Self::map_restriction(context, derivation, name),
            "list" => {
                let item_type = match actual_value::<QName>(derivation, "itemType")? {
                    Some(item_type) => context.resolve_simple_type(&item_type)?,
                    None => Self::map_nested(context, derivation)?,
                };
                Ok(Self {
                    name,
                    variety: Variety::List(item_type),
                    facets: Vec::new(),
                    whitespace: Whitespace::Collapse,
                })
            }
            "union" => {
                let mut members = Vec::new();
                for member in actual_value::<Vec<QName>>(derivation, "memberTypes")?
                    .unwrap_or_default()
                {
                    members.push(context.resolve_simple_type(&member)?);
                }
                for nested in schema_children(derivation) {
                    if nested.tag_name().name() != "simpleType" {
                        return Err(unexpected_child(derivation, nested));
                    }
                    let definition = Self::map_from_xml(context, nested, None)?;
                    members.push(context.components.create(definition));
                }
                Ok(Self {
                    name,
                    variety: Variety::Union(members),
                    facets: Vec::new(),
                    whitespace: Whitespace::Collapse,
                })
            }
            _ => Err(unexpected_child(simple_type, derivation)),
        }
    }

    /// `<xs:restriction>` inside `<xs:simpleType>`; also used for the simple content of complex
    /// types, where `base` has already been resolved.
    fn map_restriction<'a, 'input>(
        context: &mut MappingContext<'a, 'input>,
        restriction: Node<'a, 'input>,
        name: Option<QName>,
    ) -> Result<Self, SchemaError> {
        let base = match actual_value::<QName>(restriction, "base")? {
            Some(base) => context.resolve_simple_type(&base)?,
            None => Self::map_nested(context, restriction)?,
        };
        Self::restrict(context, base, restriction, name)
    }

    pub(crate) fn restrict<'a, 'input>(
        context: &mut MappingContext<'a, 'input>,
        base: Ref<SimpleTypeDefinition>,
        restriction: Node<'a, 'input>,
        name: Option<QName>,
    ) -> Result<Self, SchemaError> {
        let base = context.simple_type(base)?.clone();
        let own = ConstrainingFacet::map_restriction(context, restriction)?;

        let mut facets = base.facets;
        facets.extend(own.facets);
        Ok(Self {
            name,
            variety: base.variety,
            facets,
            whitespace: own.whitespace.unwrap_or(base.whitespace),
        })
    }

    fn map_nested<'a, 'input>(
        context: &mut MappingContext<'a, 'input>,
        parent: Node<'a, 'input>,
    ) -> Result<Ref<SimpleTypeDefinition>, SchemaError> {
        let nested = schema_children(parent)
            .find(|c| c.tag_name().name() == "simpleType")
            .ok_or_else(|| SchemaError::MissingAttribute {
                element: parent.tag_name().name().to_string(),
                attribute: "base",
            })?;
        let definition = Self::map_from_xml(context, nested, None)?;
        Ok(context.components.create(definition))
    }

    /// The built-in type whose lexical space applies, `None` for lists and unions.
    pub fn primitive(&self) -> Option<BuiltinType> {
        match self.variety {
            Variety::Atomic(builtin) => Some(builtin),
            _ => None,
        }
    }

    /// Validates a literal. The error is a complete diagnostic sentence.
    pub fn validate(&self, value: &str, table: &impl ComponentTable) -> Result<(), String> {
        let normalized = normalized_value(value, self.whitespace);
        let normalized = normalized.as_ref();

        match &self.variety {
            Variety::Atomic(builtin) => {
                if !builtin.is_valid(normalized) {
                    return Err(format!(
                        "'{normalized}' is not a valid value of the atomic type '{}'.",
                        builtin.prefixed_name()
                    ));
                }
            }
            Variety::List(item_type) => {
                let item_type = item_type.get(table);
                for item in normalized.split_ascii_whitespace() {
                    if item_type.validate(item, table).is_err() {
                        return Err(format!(
                            "'{normalized}' is not a valid value of the list type '{}'.",
                            self.display_name()
                        ));
                    }
                }
            }
            Variety::Union(members) => {
                if !members
                    .iter()
                    .any(|member| member.get(table).validate(normalized, table).is_ok())
                {
                    return Err(format!(
                        "'{normalized}' is not a valid value of the union type '{}'.",
                        self.display_name()
                    ));
                }
            }
        }

        for facet in &self.facets {
            facet.check(normalized, &self.variety)?;
        }
        Ok(())
    }

    fn display_name(&self) -> String {
        self.name
            .as_ref()
            .map_or_else(|| "local simple type".to_string(), ToString::to_string)
    }
}

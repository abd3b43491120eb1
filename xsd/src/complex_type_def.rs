use crate::{
    attribute_use::{AttributeSet, AttributeUse},
    components::Component,
    error::SchemaError,
    mapping_context::MappingContext,
    model_group::ModelGroup,
    particle::{Particle, Term},
    shared::TypeDefinition,
    values::{actual_value, required_value, schema_children, unexpected_child},
    xstypes::QName,
    Ref, SimpleTypeDefinition, Wildcard,
};
use roxmltree::Node;

/// Schema Component: Complex Type Definition, a kind of Type Definition (§3.4)
#[derive(Clone, Debug)]
pub struct ComplexTypeDefinition {
    pub name: Option<QName>,
    pub content_type: ContentType,
    pub attribute_uses: Vec<AttributeUse>,
    pub attribute_wildcard: Option<Wildcard>,
    pub abstract_: bool,
}

/// Property Record: Content Type (§3.4.1)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentType {
    Empty,
    Simple(Ref<SimpleTypeDefinition>),
    ElementOnly(Particle),
    Mixed(Particle),
}

impl ContentType {
    pub fn particle(&self) -> Option<&Particle> {
        match self {
            Self::ElementOnly(particle) | Self::Mixed(particle) => Some(particle),
            _ => None,
        }
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, Self::Mixed(_))
    }
}

impl Component for ComplexTypeDefinition {
    const DISPLAY_NAME: &'static str = "ComplexTypeDefinition";
}

impl ComplexTypeDefinition {
    /// The ur-type: any attributes, any content.
    pub(crate) fn any_type(content: Particle) -> Self {
        Self {
            name: Some(QName::with_namespace(crate::XS_NAMESPACE, "anyType")),
            content_type: ContentType::Mixed(content),
            attribute_uses: Vec::new(),
            attribute_wildcard: Some(Wildcard::ANY_LAX),
            abstract_: false,
        }
    }

    /// Maps `<xs:complexType>` (§3.4.2). `name` is `None` for anonymous definitions.
    pub(crate) fn map_from_xml<'a, 'input>(
        context: &mut MappingContext<'a, 'input>,
        complex_type: Node<'a, 'input>,
        name: Option<QName>,
    ) -> Result<Self, SchemaError> {
        let abstract_ = actual_value(complex_type, "abstract")?.unwrap_or(false);
        let mixed = actual_value(complex_type, "mixed")?.unwrap_or(false);

        let content = schema_children(complex_type)
            .find(|c| matches!(c.tag_name().name(), "simpleContent" | "complexContent"));
        let mapped = match content {
            Some(content) if content.tag_name().name() == "simpleContent" => {
                map_simple_content(context, content)?
            }
            Some(content) => {
                let mixed = actual_value(content, "mixed")?.unwrap_or(mixed);
                map_complex_content(context, content, mixed)?
            }
            // Shorthand for a restriction of xs:anyType (§3.4.2.3.3)
            None => {
                let particle = map_own_particle(context, complex_type)?;
                let attributes = AttributeSet::map_children(context, complex_type)?;
                let attribute_wildcard = attributes.wildcard.clone();
                Mapped {
                    content_type: content_type_of(context, particle, mixed),
                    attribute_uses: attributes.derive_from(&[]),
                    attribute_wildcard,
                }
            }
        };

        Ok(Self {
            name,
            content_type: mapped.content_type,
            attribute_uses: mapped.attribute_uses,
            attribute_wildcard: mapped.attribute_wildcard,
            abstract_,
        })
    }
}

struct Mapped {
    content_type: ContentType,
    attribute_uses: Vec<AttributeUse>,
    attribute_wildcard: Option<Wildcard>,
}

/// The derivation element (`<xs:extension>` or `<xs:restriction>`) of a content element.
fn derivation<'a, 'input>(content: Node<'a, 'input>) -> Result<Node<'a, 'input>, SchemaError> {
    let derivation = schema_children(content)
        .next()
        .ok_or_else(|| SchemaError::MissingAttribute {
            element: content.tag_name().name().to_string(),
            attribute: "extension|restriction",
        })?;
    match derivation.tag_name().name() {
        "extension" | "restriction" => Ok(derivation),
        _ => Err(unexpected_child(content, derivation)),
    }
}

/// The group, sequence, choice or all particle declared directly on `parent`.
fn map_own_particle<'a, 'input>(
    context: &mut MappingContext<'a, 'input>,
    parent: Node<'a, 'input>,
) -> Result<Option<Particle>, SchemaError> {
    let mut particles = schema_children(parent)
        .filter(|c| matches!(c.tag_name().name(), "group" | "sequence" | "choice" | "all"));
    let Some(node) = particles.next() else {
        return Ok(None);
    };
    if let Some(extra) = particles.next() {
        return Err(unexpected_child(parent, extra));
    }
    Particle::map_from_xml(context, node)
}

fn content_type_of(
    context: &mut MappingContext,
    particle: Option<Particle>,
    mixed: bool,
) -> ContentType {
    match (particle, mixed) {
        (Some(particle), true) => ContentType::Mixed(particle),
        (Some(particle), false) => ContentType::ElementOnly(particle),
        (None, true) => ContentType::Mixed(context.empty_sequence()),
        (None, false) => ContentType::Empty,
    }
}

/// `<xs:complexContent>` (§3.4.2.3)
fn map_complex_content<'a, 'input>(
    context: &mut MappingContext<'a, 'input>,
    content: Node<'a, 'input>,
    mixed: bool,
) -> Result<Mapped, SchemaError> {
    let derivation = derivation(content)?;
    let base_name = required_value::<QName>(derivation, "base")?;
    let base = match context.resolve_type(&base_name)? {
        TypeDefinition::Complex(base) => context.complex_type(base)?.clone(),
        TypeDefinition::Simple(_) => {
            return Err(SchemaError::InvalidAttribute {
                element: "complexContent".to_string(),
                attribute: "base",
                value: base_name.to_string(),
            })
        }
    };

    let particle = map_own_particle(context, derivation)?;
    let attributes = AttributeSet::map_children(context, derivation)?;
    let wildcard = attributes.wildcard.clone();

    if derivation.tag_name().name() == "restriction" {
        return Ok(Mapped {
            content_type: content_type_of(context, particle, mixed),
            attribute_uses: attributes.derive_from(&base.attribute_uses),
            attribute_wildcard: wildcard,
        });
    }

    // Extension appends the own particle to the base's content (§3.4.2.3.3)
    let mixed = mixed || base.content_type.is_mixed();
    let particle = match (base.content_type.particle().cloned(), particle) {
        (Some(base_particle), Some(own)) => {
            let group = ModelGroup::sequence(vec![base_particle, own]);
            Some(Particle::once(Term::ModelGroup(context.components.create(group))))
        }
        (base_particle, own) => own.or(base_particle),
    };
    Ok(Mapped {
        content_type: content_type_of(context, particle, mixed),
        attribute_uses: attributes.derive_from(&base.attribute_uses),
        attribute_wildcard: wildcard.or(base.attribute_wildcard),
    })
}

/// `<xs:simpleContent>` (§3.4.2.2)
fn map_simple_content<'a, 'input>(
    context: &mut MappingContext<'a, 'input>,
    content: Node<'a, 'input>,
) -> Result<Mapped, SchemaError> {
    let derivation = derivation(content)?;
    let base_name = required_value::<QName>(derivation, "base")?;
    let (base_simple, base_attributes, base_wildcard) = match context.resolve_type(&base_name)? {
        TypeDefinition::Simple(simple) => (simple, Vec::new(), None),
        TypeDefinition::Complex(complex) => {
            let complex = context.complex_type(complex)?.clone();
            match complex.content_type {
                ContentType::Simple(simple) => {
                    (simple, complex.attribute_uses, complex.attribute_wildcard)
                }
                _ => return Err(SchemaError::NotSimple(base_name.to_string())),
            }
        }
    };

    let attributes = AttributeSet::map_children(context, derivation)?;
    let wildcard = attributes.wildcard.clone();

    let simple = if derivation.tag_name().name() == "restriction" {
        let restricted = SimpleTypeDefinition::restrict(context, base_simple, derivation, None)?;
        context.components.create(restricted)
    } else {
        base_simple
    };

    Ok(Mapped {
        content_type: ContentType::Simple(simple),
        attribute_uses: attributes.derive_from(&base_attributes),
        attribute_wildcard: wildcard.or(base_wildcard),
    })
}

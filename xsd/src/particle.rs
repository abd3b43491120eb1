use crate::{
    error::SchemaError,
    mapping_context::MappingContext,
    values::{actual_value, required_value, unexpected_child},
    xstypes::QName,
    ElementDeclaration, ModelGroup, Ref, Wildcard,
};
use roxmltree::Node;

/// Schema Component: Particle (§3.9)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Particle {
    pub min_occurs: u64,
    pub max_occurs: MaxOccurs,
    pub term: Term,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaxOccurs {
    Unbounded,
    Count(u64),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Term {
    ElementDeclaration(Ref<ElementDeclaration>),
    ModelGroup(Ref<ModelGroup>),
    Wildcard(Ref<Wildcard>),
}

impl Particle {
    pub(crate) fn once(term: Term) -> Self {
        Self {
            min_occurs: 1,
            max_occurs: MaxOccurs::Count(1),
            term,
        }
    }

    /// Maps a particle-bearing element (§3.9.2). Returns `None` for `maxOccurs="0"`, which
    /// contributes nothing to the content model.
    pub(crate) fn map_from_xml<'a, 'input>(
        context: &mut MappingContext<'a, 'input>,
        node: Node<'a, 'input>,
    ) -> Result<Option<Self>, SchemaError> {
        let min_occurs = actual_value::<u64>(node, "minOccurs")?.unwrap_or(1);
        let max_occurs = actual_value::<MaxOccurs>(node, "maxOccurs")?.unwrap_or(MaxOccurs::Count(1));

        if let MaxOccurs::Count(max) = max_occurs {
            if max < min_occurs {
                return Err(SchemaError::InvalidOccurrence {
                    min: min_occurs,
                    max,
                });
            }
            if max == 0 {
                return Ok(None);
            }
        }

        let term = match node.tag_name().name() {
            "element" => Term::ElementDeclaration(ElementDeclaration::map_particle_term(
                context, node,
            )?),
            "group" => Term::ModelGroup(context.resolve_group(&required_value::<QName>(node, "ref")?)?),
            "sequence" | "choice" | "all" => {
                let group = ModelGroup::map_from_xml(context, node)?;
                Term::ModelGroup(context.components.create(group))
            }
            "any" => {
                let wildcard = Wildcard::map_from_xml(context, node)?;
                Term::Wildcard(context.components.create(wildcard))
            }
            _ => return Err(unexpected_child(node.parent().unwrap_or(node), node)),
        };

        Ok(Some(Self {
            min_occurs,
            max_occurs,
            term,
        }))
    }
}

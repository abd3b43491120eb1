use crate::{
    components::Component,
    error::SchemaError,
    mapping_context::MappingContext,
    particle::Particle,
    values::{schema_children, unexpected_child},
};
use roxmltree::Node;

/// Schema Component: Model Group, a kind of Term (§3.8)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelGroup {
    pub compositor: Compositor,
    pub particles: Vec<Particle>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Compositor {
    All,
    Choice,
    Sequence,
}

impl Component for ModelGroup {
    const DISPLAY_NAME: &'static str = "ModelGroup";
}

impl ModelGroup {
    pub(crate) fn sequence(particles: Vec<Particle>) -> Self {
        Self {
            compositor: Compositor::Sequence,
            particles,
        }
    }

    /// Maps `<xs:sequence>`, `<xs:choice>` or `<xs:all>` (§3.8.2).
    pub(crate) fn map_from_xml<'a, 'input>(
        context: &mut MappingContext<'a, 'input>,
        node: Node<'a, 'input>,
    ) -> Result<Self, SchemaError> {
        let compositor = match node.tag_name().name() {
            "all" => Compositor::All,
            "choice" => Compositor::Choice,
            "sequence" => Compositor::Sequence,
            _ => return Err(unexpected_child(node.parent().unwrap_or(node), node)),
        };

        let mut particles = Vec::new();
        for child in schema_children(node) {
            let allowed = match compositor {
                Compositor::All => matches!(child.tag_name().name(), "element" | "any"),
                _ => matches!(
                    child.tag_name().name(),
                    "element" | "group" | "choice" | "sequence" | "any"
                ),
            };
            if !allowed {
                return Err(unexpected_child(node, child));
            }
            if let Some(particle) = Particle::map_from_xml(context, child)? {
                particles.push(particle);
            }
        }

        Ok(Self {
            compositor,
            particles,
        })
    }
}

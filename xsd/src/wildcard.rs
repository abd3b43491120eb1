use crate::{
    components::Component, error::SchemaError, mapping_context::MappingContext,
    values::actual_value,
};
use roxmltree::Node;

/// Schema Component: Wildcard, a kind of Term (§3.10)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wildcard {
    pub namespace_constraint: NamespaceConstraint,
    pub process_contents: ProcessContents,
}

/// `None` entries stand for "no namespace".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamespaceConstraint {
    Any,
    Enumeration(Vec<Option<String>>),
    Not(Vec<Option<String>>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcessContents {
    Skip,
    Strict,
    Lax,
}

impl Component for Wildcard {
    const DISPLAY_NAME: &'static str = "Wildcard";
}

impl Wildcard {
    pub const ANY_LAX: Self = Self {
        namespace_constraint: NamespaceConstraint::Any,
        process_contents: ProcessContents::Lax,
    };

    /// Maps `<xs:any>` or `<xs:anyAttribute>` (§3.10.2).
    pub(crate) fn map_from_xml(context: &MappingContext, node: Node) -> Result<Self, SchemaError> {
        let namespace = actual_value::<&str>(node, "namespace")?.unwrap_or("##any");
        let target_namespace = context.target_namespace.clone();

        let namespace_constraint = match namespace.trim() {
            "##any" => NamespaceConstraint::Any,
            "##other" => NamespaceConstraint::Not(vec![target_namespace, None]),
            list => NamespaceConstraint::Enumeration(
                list.split_ascii_whitespace()
                    .map(|token| match token {
                        "##targetNamespace" => target_namespace.clone(),
                        "##local" => None,
                        uri => Some(uri.to_string()),
                    })
                    .collect(),
            ),
        };

        let process_contents = match actual_value::<&str>(node, "processContents")? {
            None | Some("strict") => ProcessContents::Strict,
            Some("lax") => ProcessContents::Lax,
            Some("skip") => ProcessContents::Skip,
            Some(other) => {
                return Err(SchemaError::InvalidAttribute {
                    element: node.tag_name().name().to_string(),
                    attribute: "processContents",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            namespace_constraint,
            process_contents,
        })
    }

    /// Wildcard allows Namespace Name (§3.10.4.3)
    pub fn allows(&self, namespace: Option<&str>) -> bool {
        let listed = |list: &[Option<String>]| list.iter().any(|n| n.as_deref() == namespace);
        match &self.namespace_constraint {
            NamespaceConstraint::Any => true,
            NamespaceConstraint::Enumeration(list) => listed(list),
            NamespaceConstraint::Not(list) => !listed(list),
        }
    }
}

impl NamespaceConstraint {
    /// Whether some namespace name is allowed by both constraints.
    pub fn overlaps(&self, other: &Self) -> bool {
        use NamespaceConstraint::*;
        match (self, other) {
            (Any, _) | (_, Any) => true,
            (Enumeration(a), Enumeration(b)) => a.iter().any(|n| b.contains(n)),
            (Enumeration(listed), Not(excluded)) | (Not(excluded), Enumeration(listed)) => {
                listed.iter().any(|n| !excluded.contains(n))
            }
            // Infinitely many namespace names remain
            (Not(_), Not(_)) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_excludes_target_and_absent() {
        let wildcard = Wildcard {
            namespace_constraint: NamespaceConstraint::Not(vec![Some("urn:t".into()), None]),
            process_contents: ProcessContents::Lax,
        };
        assert!(wildcard.allows(Some("urn:other")));
        assert!(!wildcard.allows(Some("urn:t")));
        assert!(!wildcard.allows(None));
        assert!(Wildcard::ANY_LAX.allows(None));
    }

    #[test]
    fn overlapping_namespace_constraints() {
        let t = || Some("urn:t".to_string());
        let other = NamespaceConstraint::Not(vec![t(), None]);
        let local = NamespaceConstraint::Enumeration(vec![None]);
        let target = NamespaceConstraint::Enumeration(vec![t()]);
        assert!(NamespaceConstraint::Any.overlaps(&local));
        assert!(!other.overlaps(&local));
        assert!(!local.overlaps(&target));
        assert!(target.overlaps(&NamespaceConstraint::Enumeration(vec![None, t()])));
        assert!(other.overlaps(&NamespaceConstraint::Enumeration(vec![Some("urn:x".into())])));
    }
}

use crate::{
    attribute_use::AttributeSet,
    components::{Component, ComponentTraits, ConstructionComponentTable, HasArenaContainer},
    error::SchemaError,
    model_group::ModelGroup,
    particle::{MaxOccurs, Particle, Term},
    shared::TypeDefinition,
    values::{actual_value, required_value, schema_children},
    xstypes::QName,
    ComplexTypeDefinition, ElementDeclaration, Ref, SimpleTypeDefinition, Wildcard,
};
use addenda_builtins::BuiltinType;
use roxmltree::Node;
use std::collections::HashMap;

/// Top-level schema elements by expanded name, before they are mapped.
#[derive(Default)]
struct TopLevel<'a, 'input> {
    types: HashMap<QName, Node<'a, 'input>>,
    elements: HashMap<QName, Node<'a, 'input>>,
    groups: HashMap<QName, Node<'a, 'input>>,
    attribute_groups: HashMap<QName, Node<'a, 'input>>,
    attributes: HashMap<QName, Node<'a, 'input>>,
}

/// State shared by all mapping functions while one schema document is compiled.
///
/// Named components are mapped on first reference. Their slot is reserved and cached before
/// mapping starts, so a component may refer to itself through a particle; reading an unfinished
/// slot's *contents* (e.g. deriving from oneself) fails with [`SchemaError::Circular`].
pub(crate) struct MappingContext<'a, 'input> {
    pub(crate) target_namespace: Option<String>,
    pub(crate) element_form_qualified: bool,
    pub(crate) attribute_form_qualified: bool,
    pub(crate) components: ConstructionComponentTable,
    pub(crate) warnings: Vec<String>,
    top_level: TopLevel<'a, 'input>,
    types: HashMap<QName, TypeDefinition>,
    elements: HashMap<QName, Ref<ElementDeclaration>>,
    groups: HashMap<QName, Ref<ModelGroup>>,
    attribute_groups: HashMap<QName, AttributeSet>,
    attribute_groups_in_progress: Vec<QName>,
    builtins: HashMap<BuiltinType, Ref<SimpleTypeDefinition>>,
    any_type: Option<Ref<ComplexTypeDefinition>>,
}

impl<'a, 'input> MappingContext<'a, 'input> {
    /// Reads the `<xs:schema>` attributes and indexes its top-level declarations.
    pub(crate) fn new(schema: Node<'a, 'input>) -> Result<Self, SchemaError> {
        let form = |attribute: &'static str| -> Result<bool, SchemaError> {
            match actual_value::<&str>(schema, attribute)? {
                None | Some("unqualified") => Ok(false),
                Some("qualified") => Ok(true),
                Some(other) => Err(SchemaError::InvalidAttribute {
                    element: "schema".to_string(),
                    attribute,
                    value: other.to_string(),
                }),
            }
        };

        let mut context = Self {
            target_namespace: actual_value::<String>(schema, "targetNamespace")?,
            element_form_qualified: form("elementFormDefault")?,
            attribute_form_qualified: form("attributeFormDefault")?,
            components: ConstructionComponentTable::new(),
            warnings: Vec::new(),
            top_level: TopLevel::default(),
            types: HashMap::new(),
            elements: HashMap::new(),
            groups: HashMap::new(),
            attribute_groups: HashMap::new(),
            attribute_groups_in_progress: Vec::new(),
            builtins: HashMap::new(),
            any_type: None,
        };

        for child in schema_children(schema) {
            let tag = child.tag_name().name();
            let (kind, table) = match tag {
                "simpleType" | "complexType" => ("type", &mut context.top_level.types),
                "element" => ("element", &mut context.top_level.elements),
                "group" => ("group", &mut context.top_level.groups),
                "attributeGroup" => ("attribute group", &mut context.top_level.attribute_groups),
                "attribute" => ("attribute", &mut context.top_level.attributes),
                "import" | "include" => {
                    let location = child.attribute("schemaLocation").unwrap_or("?");
                    let message = format!("<xs:{tag} schemaLocation={location:?}> was skipped");
                    context.warn(message);
                    continue;
                }
                "redefine" | "override" => return Err(SchemaError::Unsupported(tag.to_string())),
                "notation" | "defaultOpenContent" => continue,
                _ => {
                    return Err(SchemaError::UnexpectedChild {
                        parent: "schema".to_string(),
                        child: tag.to_string(),
                    })
                }
            };
            let name = QName::with_optional_namespace(
                context.target_namespace.clone(),
                required_value::<&str>(child, "name")?,
            );
            if table.insert(name.clone(), child).is_some() {
                return Err(SchemaError::DuplicateDeclaration {
                    kind,
                    name: name.to_string(),
                });
            }
        }

        Ok(context)
    }

    pub(crate) fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    /// Names of the top-level types and groups, in no particular order. Top-level elements are
    /// resolved while the schema root is walked.
    pub(crate) fn top_level_names(&self) -> TopLevelNames {
        fn names<V>(map: &HashMap<QName, V>) -> Vec<QName> {
            map.keys().cloned().collect()
        }
        TopLevelNames {
            types: names(&self.top_level.types),
            groups: names(&self.top_level.groups),
            attribute_groups: names(&self.top_level.attribute_groups),
        }
    }

    pub(crate) fn resolve_type(&mut self, name: &QName) -> Result<TypeDefinition, SchemaError> {
        if name.is_xs() {
            if name.local_name == "anyType" {
                return Ok(TypeDefinition::Complex(self.any_type()));
            }
            return BuiltinType::from_name(&name.local_name)
                .map(|builtin| TypeDefinition::Simple(self.builtin(builtin)))
                .map_err(|_| unresolved("type", name));
        }
        if let Some(definition) = self.types.get(name) {
            return Ok(*definition);
        }

        let node = *self
            .top_level
            .types
            .get(name)
            .ok_or_else(|| unresolved("type", name))?;
        if node.tag_name().name() == "simpleType" {
            let ref_ = self.components.reserve();
            self.types.insert(name.clone(), TypeDefinition::Simple(ref_));
            let definition = SimpleTypeDefinition::map_from_xml(self, node, Some(name.clone()))?;
            self.components.insert(ref_, definition);
            Ok(TypeDefinition::Simple(ref_))
        } else {
            let ref_ = self.components.reserve();
            self.types.insert(name.clone(), TypeDefinition::Complex(ref_));
            let definition = ComplexTypeDefinition::map_from_xml(self, node, Some(name.clone()))?;
            self.components.insert(ref_, definition);
            Ok(TypeDefinition::Complex(ref_))
        }
    }

    pub(crate) fn resolve_simple_type(
        &mut self,
        name: &QName,
    ) -> Result<Ref<SimpleTypeDefinition>, SchemaError> {
        match self.resolve_type(name)? {
            TypeDefinition::Simple(simple) => Ok(simple),
            TypeDefinition::Complex(_) => Err(SchemaError::NotSimple(name.to_string())),
        }
    }

    /// Maps an anonymous `<xs:simpleType>` or `<xs:complexType>`.
    pub(crate) fn map_anonymous_type(
        &mut self,
        node: Node<'a, 'input>,
    ) -> Result<TypeDefinition, SchemaError> {
        if node.tag_name().name() == "simpleType" {
            let definition = SimpleTypeDefinition::map_from_xml(self, node, None)?;
            Ok(TypeDefinition::Simple(self.components.create(definition)))
        } else {
            let definition = ComplexTypeDefinition::map_from_xml(self, node, None)?;
            Ok(TypeDefinition::Complex(self.components.create(definition)))
        }
    }

    pub(crate) fn resolve_element(
        &mut self,
        name: &QName,
    ) -> Result<Ref<ElementDeclaration>, SchemaError> {
        if let Some(element) = self.elements.get(name) {
            return Ok(*element);
        }
        let node = *self
            .top_level
            .elements
            .get(name)
            .ok_or_else(|| unresolved("element", name))?;
        let ref_ = self.components.reserve();
        self.elements.insert(name.clone(), ref_);
        let declaration = ElementDeclaration::map_global(self, node)?;
        Ok(self.components.insert(ref_, declaration))
    }

    /// Model Group Definitions (§3.7) are not kept as components; a reference resolves to the
    /// group's model group.
    pub(crate) fn resolve_group(&mut self, name: &QName) -> Result<Ref<ModelGroup>, SchemaError> {
        if let Some(group) = self.groups.get(name) {
            return Ok(*group);
        }
        let node = *self
            .top_level
            .groups
            .get(name)
            .ok_or_else(|| unresolved("group", name))?;
        let compositor = schema_children(node)
            .next()
            .ok_or_else(|| SchemaError::MissingAttribute {
                element: "group".to_string(),
                attribute: "sequence|choice|all",
            })?;
        let ref_ = self.components.reserve();
        self.groups.insert(name.clone(), ref_);
        let group = ModelGroup::map_from_xml(self, compositor)?;
        Ok(self.components.insert(ref_, group))
    }

    pub(crate) fn resolve_attribute_group(
        &mut self,
        name: &QName,
    ) -> Result<AttributeSet, SchemaError> {
        if let Some(set) = self.attribute_groups.get(name) {
            return Ok(set.clone());
        }
        if self.attribute_groups_in_progress.contains(name) {
            return Err(SchemaError::Circular(name.to_string()));
        }
        let node = *self
            .top_level
            .attribute_groups
            .get(name)
            .ok_or_else(|| unresolved("attribute group", name))?;

        self.attribute_groups_in_progress.push(name.clone());
        let set = AttributeSet::map_children(self, node);
        self.attribute_groups_in_progress.pop();

        let set = set?;
        self.attribute_groups.insert(name.clone(), set.clone());
        Ok(set)
    }

    pub(crate) fn global_attribute(&self, name: &QName) -> Result<Node<'a, 'input>, SchemaError> {
        self.top_level
            .attributes
            .get(name)
            .copied()
            .ok_or_else(|| unresolved("attribute", name))
    }

    pub(crate) fn builtin(&mut self, builtin: BuiltinType) -> Ref<SimpleTypeDefinition> {
        if let Some(ref_) = self.builtins.get(&builtin) {
            return *ref_;
        }
        let ref_ = self.components.create(SimpleTypeDefinition::builtin(builtin));
        self.builtins.insert(builtin, ref_);
        ref_
    }

    pub(crate) fn any_type(&mut self) -> Ref<ComplexTypeDefinition> {
        if let Some(any_type) = self.any_type {
            return any_type;
        }
        let wildcard = self.components.create(Wildcard::ANY_LAX);
        let content = Particle {
            min_occurs: 0,
            max_occurs: MaxOccurs::Unbounded,
            term: Term::Wildcard(wildcard),
        };
        let any_type = self.components.create(ComplexTypeDefinition::any_type(content));
        self.any_type = Some(any_type);
        any_type
    }

    pub(crate) fn empty_sequence(&mut self) -> Particle {
        let group = self.components.create(ModelGroup::sequence(Vec::new()));
        Particle::once(Term::ModelGroup(group))
    }

    pub(crate) fn simple_type(
        &self,
        ref_: Ref<SimpleTypeDefinition>,
    ) -> Result<&SimpleTypeDefinition, SchemaError> {
        self.finished(ref_)
    }

    pub(crate) fn complex_type(
        &self,
        ref_: Ref<ComplexTypeDefinition>,
    ) -> Result<&ComplexTypeDefinition, SchemaError> {
        self.finished(ref_)
    }

    fn finished<R>(&self, ref_: Ref<R>) -> Result<&R, SchemaError>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        self.components
            .try_get(ref_)
            .ok_or_else(|| SchemaError::Circular(self.name_of_reserved(ref_)))
    }

    fn name_of_reserved<R>(&self, ref_: Ref<R>) -> String
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        let index = ref_.index();
        self.types
            .iter()
            .find(|(_, definition)| match definition {
                TypeDefinition::Simple(r) => {
                    R::DISPLAY_NAME == SimpleTypeDefinition::DISPLAY_NAME && r.index() == index
                }
                TypeDefinition::Complex(r) => {
                    R::DISPLAY_NAME == ComplexTypeDefinition::DISPLAY_NAME && r.index() == index
                }
            })
            .map_or_else(|| format!("{ref_:?}"), |(name, _)| name.to_string())
    }
}

pub(crate) struct TopLevelNames {
    pub types: Vec<QName>,
    pub groups: Vec<QName>,
    pub attribute_groups: Vec<QName>,
}

fn unresolved(kind: &'static str, name: &QName) -> SchemaError {
    SchemaError::UnresolvedReference {
        kind,
        name: name.to_string(),
    }
}

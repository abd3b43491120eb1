use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::num::{NonZeroU32, NonZeroUsize};

use super::{
    ComplexTypeDefinition, ElementDeclaration, ModelGroup, SimpleTypeDefinition, Wildcard,
};

/// Trait implemented by all concrete schema components.
pub trait Component {
    const DISPLAY_NAME: &'static str;
}

/// Type on which internal component traits are implemented.
///
/// This type is used to prevent leaking internal functions into the [`Component`]
pub struct ComponentTraits;

/// A component referencable via [`Ref`]. Intended for internal use.
pub trait HasArenaContainer<R: Component>: Sized {
    fn get_container_from_construction_component_table(
        table: &ConstructionComponentTable,
    ) -> &[Option<R>];
    fn get_container_from_construction_component_table_mut(
        table: &mut ConstructionComponentTable,
    ) -> &mut Vec<Option<R>>;
    fn get_container_from_schema_component_table(table: &SchemaComponentTable) -> &[R];
}

/// A reference to a [`Component`] stored in a [`ComponentTable`]
pub struct Ref<R>(NonZeroU32, PhantomData<fn() -> R>)
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>;

impl<R> Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    const fn from_inner(inner: NonZeroU32) -> Self {
        Self(inner, PhantomData)
    }

    pub(crate) fn index(self) -> usize {
        self.0.get() as usize - 1
    }

    pub fn get(self, table: &impl ComponentTable) -> &R {
        table.get(self)
    }
}

// derive(...) does not work if R itself does not derive the trait, even though it is only "used"
// in the PhantomData; hence the manual implementations.

impl<R> Copy for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
}

impl<R> Clone for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> fmt::Debug for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{} #{}>", R::DISPLAY_NAME, self.0)
    }
}

impl<R> PartialEq for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<R> Eq for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
}

/// Orders by creation, which for local declarations is document order.
impl<R> PartialOrd for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<R> Ord for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl<R> Hash for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// An arena-like container for the schema components.
pub trait ComponentTable {
    /// Retrieves a component's value by reference from this component table.
    /// This function panics if the component value is not present in the table.
    fn get<R>(&self, ref_: Ref<R>) -> &R
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>;
}

/// The [component table](ComponentTable) used while a schema is compiled.
///
/// Slots are `Option`s because named components are reserved before they are mapped, which lets
/// them reference themselves (recursive element structures, for instance).
#[derive(Default)]
pub struct ConstructionComponentTable {
    complex_type_definitions: Vec<Option<ComplexTypeDefinition>>,
    element_declarations: Vec<Option<ElementDeclaration>>,
    model_groups: Vec<Option<ModelGroup>>,
    simple_type_definitions: Vec<Option<SimpleTypeDefinition>>,
    wildcards: Vec<Option<Wildcard>>,
}

impl ComponentTable for ConstructionComponentTable {
    fn get<R>(&self, ref_: Ref<R>) -> &R
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        self.try_get(ref_).expect("Component is not present")
    }
}

impl ConstructionComponentTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Like [`ComponentTable::get`], but returns `None` for a reserved slot that has not been
    /// filled yet.
    pub(crate) fn try_get<R>(&self, ref_: Ref<R>) -> Option<&R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        ComponentTraits::get_container_from_construction_component_table(self)
            .get(ref_.index())
            .expect("Invalid component reference (out-of-bounds)")
            .as_ref()
    }

    /// Creates a [`Ref`] which points to an absent, reserved slot in the table.
    pub(crate) fn reserve<R>(&mut self) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        let container = ComponentTraits::get_container_from_construction_component_table_mut(self);
        container.push(None);

        // The size after the push is the ID, which makes it non-zero
        let size = NonZeroUsize::new(container.len()).expect("container cannot be empty");
        let id: NonZeroU32 = size.try_into().expect("ID did not fit into 32-bit integer");
        Ref::from_inner(id)
    }

    /// Inserts the `value` into the slot pointed to by `ref_`. Returns `ref_` for convenience.
    pub(crate) fn insert<R>(&mut self, ref_: Ref<R>, value: R) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        let container = ComponentTraits::get_container_from_construction_component_table_mut(self);
        let slot = container
            .get_mut(ref_.index())
            .expect("Invalid component reference (out-of-bounds)");
        *slot = Some(value);
        ref_
    }

    /// Shorthand for `insert(reserve(), value)`
    pub(crate) fn create<R>(&mut self, value: R) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        let ref_ = self.reserve();
        self.insert(ref_, value)
    }

    /// Converts into the read-only [`SchemaComponentTable`]. Fails if any reserved slot was left
    /// empty.
    pub(crate) fn convert_to_schema_table(self) -> Option<SchemaComponentTable> {
        Some(SchemaComponentTable {
            complex_type_definitions: Self::convert_container(self.complex_type_definitions)?,
            element_declarations: Self::convert_container(self.element_declarations)?,
            model_groups: Self::convert_container(self.model_groups)?,
            simple_type_definitions: Self::convert_container(self.simple_type_definitions)?,
            wildcards: Self::convert_container(self.wildcards)?,
        })
    }

    fn convert_container<R>(container: Vec<Option<R>>) -> Option<Box<[R]>> {
        container.into_iter().collect::<Option<Vec<_>>>().map(Vec::into_boxed_slice)
    }
}

/// The [component table](ComponentTable) that backs a compiled schema.
///
/// Components for which a [`Ref`] exists will always be present in this table.
#[derive(Debug)]
pub struct SchemaComponentTable {
    complex_type_definitions: Box<[ComplexTypeDefinition]>,
    element_declarations: Box<[ElementDeclaration]>,
    model_groups: Box<[ModelGroup]>,
    simple_type_definitions: Box<[SimpleTypeDefinition]>,
    wildcards: Box<[Wildcard]>,
}

impl ComponentTable for SchemaComponentTable {
    fn get<R>(&self, ref_: Ref<R>) -> &R
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        ComponentTraits::get_container_from_schema_component_table(self)
            .get(ref_.index())
            .expect("Invalid component reference (out-of-bounds)")
    }
}

impl SchemaComponentTable {
    /// References to every complex type definition, named or anonymous.
    pub fn complex_type_refs(&self) -> impl Iterator<Item = Ref<ComplexTypeDefinition>> + '_ {
        (1..=self.complex_type_definitions.len()).filter_map(|id| {
            let id = u32::try_from(id).ok().and_then(NonZeroU32::new)?;
            Some(Ref::from_inner(id))
        })
    }

    pub fn element_declarations(&self) -> &[ElementDeclaration] {
        &self.element_declarations
    }
}

macro_rules! has_arena_container_impl {
    ($type_name:ty, $field_name:ident) => {
        impl HasArenaContainer<$type_name> for ComponentTraits {
            fn get_container_from_construction_component_table(
                table: &ConstructionComponentTable,
            ) -> &[Option<$type_name>] {
                &table.$field_name
            }

            fn get_container_from_construction_component_table_mut(
                table: &mut ConstructionComponentTable,
            ) -> &mut Vec<Option<$type_name>> {
                &mut table.$field_name
            }

            fn get_container_from_schema_component_table(
                table: &SchemaComponentTable,
            ) -> &[$type_name] {
                &table.$field_name
            }
        }
    };
}

has_arena_container_impl!(ComplexTypeDefinition, complex_type_definitions);
has_arena_container_impl!(ElementDeclaration, element_declarations);
has_arena_container_impl!(ModelGroup, model_groups);
has_arena_container_impl!(SimpleTypeDefinition, simple_type_definitions);
has_arena_container_impl!(Wildcard, wildcards);

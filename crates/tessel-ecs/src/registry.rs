//! Shape registration.
//!
//! A *shape* is a plain-data Rust type used as a component, message or
//! relation payload. Each shape gets a dense numeric id the first time a
//! world sees it. The three id spaces are independent counters, and each
//! space has its own id type so they cannot be mixed up.

use std::{
    alloc::Layout,
    any::{TypeId, type_name},
    fmt,
};

use bytemuck::Pod;

use crate::FxHashMap;

macro_rules! shape_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create an id from a raw value.
            #[must_use]
            pub const fn from_raw(id: u32) -> Self {
                Self(id)
            }

            /// Get the raw id value.
            #[must_use]
            pub const fn as_raw(self) -> u32 {
                self.0
            }

            /// The id as a table index.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

shape_id! {
    /// Identity of a component shape.
    ComponentId
}

shape_id! {
    /// Identity of a message shape.
    MessageId
}

shape_id! {
    /// Identity of a relation shape.
    RelationId
}

/// Runtime description of a plain-data shape.
#[derive(Clone, Copy)]
pub struct ShapeInfo {
    name: &'static str,
    layout: Layout,
    type_id: TypeId,
}

impl ShapeInfo {
    /// Describe a concrete plain-data type.
    #[must_use]
    pub fn of<T: Pod>() -> Self {
        Self {
            name: type_name::<T>(),
            layout: Layout::new::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// Type name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn layout(&self) -> Layout {
        self.layout
    }

    /// Size of one element in bytes (the store stride).
    #[must_use]
    pub const fn size(&self) -> usize {
        self.layout.size()
    }

    #[must_use]
    pub const fn align(&self) -> usize {
        self.layout.align()
    }

    /// Check if this info describes `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Debug for ShapeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeInfo")
            .field("name", &self.name)
            .field("size", &self.layout.size())
            .field("align", &self.layout.align())
            .finish()
    }
}

/// One independent id space.
#[derive(Default)]
struct ShapeSpace {
    by_type: FxHashMap<TypeId, u32>,
    infos: Vec<ShapeInfo>,
}

impl ShapeSpace {
    fn register<T: Pod>(&mut self) -> u32 {
        let infos = &mut self.infos;
        *self.by_type.entry(TypeId::of::<T>()).or_insert_with(|| {
            let id = infos.len() as u32;
            infos.push(ShapeInfo::of::<T>());
            id
        })
    }

    fn get<T: 'static>(&self) -> Option<u32> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    fn info(&self, raw: u32) -> Option<&ShapeInfo> {
        self.infos.get(raw as usize)
    }

    fn len(&self) -> usize {
        self.infos.len()
    }
}

/// Lazily populated map from Rust types to shape ids.
///
/// Ids are assigned in first-use order starting at zero, so they double as
/// indices into the per-shape table vectors kept by the world.
#[derive(Default)]
pub struct TypeRegistry {
    components: ShapeSpace,
    messages: ShapeSpace,
    relations: ShapeSpace,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or assign the component id for `T`.
    pub fn register_component<T: Pod>(&mut self) -> ComponentId {
        ComponentId(self.components.register::<T>())
    }

    /// Get or assign the message id for `T`.
    pub fn register_message<T: Pod>(&mut self) -> MessageId {
        MessageId(self.messages.register::<T>())
    }

    /// Get or assign the relation id for `T`.
    pub fn register_relation<T: Pod>(&mut self) -> RelationId {
        RelationId(self.relations.register::<T>())
    }

    #[must_use]
    pub fn component_id<T: 'static>(&self) -> Option<ComponentId> {
        self.components.get::<T>().map(ComponentId)
    }

    #[must_use]
    pub fn message_id<T: 'static>(&self) -> Option<MessageId> {
        self.messages.get::<T>().map(MessageId)
    }

    #[must_use]
    pub fn relation_id<T: 'static>(&self) -> Option<RelationId> {
        self.relations.get::<T>().map(RelationId)
    }

    #[must_use]
    pub fn component_info(&self, id: ComponentId) -> Option<&ShapeInfo> {
        self.components.info(id.0)
    }

    #[must_use]
    pub fn message_info(&self, id: MessageId) -> Option<&ShapeInfo> {
        self.messages.info(id.0)
    }

    #[must_use]
    pub fn relation_info(&self, id: RelationId) -> Option<&ShapeInfo> {
        self.relations.info(id.0)
    }

    /// Number of registered component shapes.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Number of registered message shapes.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Number of registered relation shapes.
    #[must_use]
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("components", &self.components.infos)
            .field("messages", &self.messages.infos)
            .field("relations", &self.relations.infos)
            .finish()
    }
}

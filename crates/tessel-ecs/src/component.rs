//! Component tables.
//!
//! Every component shape gets one [`ComponentTable`]: a dense payload store
//! plus the two maps that tie slots to entities. Removal swaps the last
//! payload into the hole, so a table stays packed with no tombstones.

use std::fmt;

use bytemuck::Pod;

use crate::{
    FxHashMap,
    entity::Entity,
    registry::{ComponentId, ShapeInfo},
    storage::DenseStore,
};

/// Marker trait for types that can be used as components.
///
/// Components are fixed-layout plain data: payloads are relocated with a
/// byte copy whenever a neighbour is swap-removed.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
/// #[repr(C)]
/// struct Position { x: f32, y: f32 }
/// ```
pub trait Component: Pod {}

// Blanket implementation for all suitable types
impl<T: Pod> Component for T {}

/// Outcome of writing a value into a keyed table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insertion {
    /// A new row was appended; queries must re-evaluate the entity.
    Added,
    /// An existing row was overwritten in place.
    Updated,
}

impl Insertion {
    #[must_use]
    pub const fn is_added(self) -> bool {
        matches!(self, Self::Added)
    }
}

/// Storage for every instance of one component shape.
///
/// Invariants: `entities[slots[e]] == e` for every stored `e`, and the
/// payload store and entity list always have the same length.
pub struct ComponentTable {
    id: ComponentId,
    /// Entity to slot index.
    slots: FxHashMap<Entity, usize>,
    /// Payloads by slot.
    store: DenseStore,
    /// Slot index to entity.
    entities: Vec<Entity>,
}

impl ComponentTable {
    #[must_use]
    pub fn new(id: ComponentId, info: ShapeInfo) -> Self {
        Self {
            id,
            slots: FxHashMap::default(),
            store: DenseStore::new(info),
            entities: Vec::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    #[must_use]
    pub const fn info(&self) -> &ShapeInfo {
        self.store.info()
    }

    /// Number of entities carrying this component.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.slots.contains_key(&entity)
    }

    /// Current slot of an entity's payload. Only valid until the next removal.
    #[must_use]
    pub fn slot_of(&self, entity: Entity) -> Option<usize> {
        self.slots.get(&entity).copied()
    }

    /// Entities in slot order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Insert or overwrite a payload from raw bytes.
    pub fn insert_bytes(&mut self, entity: Entity, bytes: &[u8]) -> Insertion {
        if let Some(&slot) = self.slots.get(&entity) {
            self.store.set_bytes(slot, bytes);
            return Insertion::Updated;
        }

        let slot = self.store.push_bytes(bytes);
        self.slots.insert(entity, slot);
        self.entities.push(entity);
        debug_assert_eq!(self.store.len(), self.entities.len());

        Insertion::Added
    }

    /// Insert or overwrite a typed payload.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not this table's shape.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> Insertion {
        assert!(
            self.info().is::<T>(),
            "`{}` written into the `{}` table",
            std::any::type_name::<T>(),
            self.info().name()
        );
        self.insert_bytes(entity, bytemuck::bytes_of(&value))
    }

    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let slot = self.slot_of(entity)?;
        self.store.get(slot)
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let slot = self.slot_of(entity)?;
        self.store.get_mut(slot)
    }

    /// Raw payload bytes for an entity.
    #[must_use]
    pub fn get_bytes(&self, entity: Entity) -> Option<&[u8]> {
        let slot = self.slot_of(entity)?;
        self.store.slot_bytes(slot)
    }

    /// Remove an entity's payload.
    ///
    /// Returns `false` if the entity had no payload here. The last payload is
    /// moved into the vacated slot and its entity's mapping is repointed.
    pub fn remove(&mut self, entity: Entity) -> bool {
        let Some(slot) = self.slots.remove(&entity) else {
            return false;
        };

        self.store.swap_remove(slot);
        self.entities.swap_remove(slot);

        if let Some(&moved) = self.entities.get(slot) {
            self.slots.insert(moved, slot);
        }
        debug_assert_eq!(self.store.len(), self.entities.len());

        true
    }

    /// Payloads in slot order, parallel to [`entities`](Self::entities).
    #[must_use]
    pub fn values<T: Component>(&self) -> &[T] {
        self.store.as_slice()
    }

    /// Mutable payloads in slot order.
    pub fn values_mut<T: Component>(&mut self) -> &mut [T] {
        self.store.as_mut_slice()
    }

    /// Iterate over `(entity, payload)` pairs in slot order.
    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.entities.iter().copied().zip(self.values::<T>())
    }
}

impl fmt::Debug for ComponentTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTable")
            .field("id", &self.id)
            .field("shape", &self.info().name())
            .field("len", &self.len())
            .finish()
    }
}

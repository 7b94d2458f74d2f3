//! Entity identifiers with generational indices.
//!
//! Entity indices are recycled through a free list. Each slot carries a
//! generation that is bumped on destruction, so a stale handle never aliases
//! the entity that later reuses its index.

use std::fmt;

use crate::{FxHashSet, registry::ComponentId};

/// Generation counter to detect stale entity references.
/// Incremented each time an entity slot is recycled.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u32);

impl Generation {
    /// Create a new generation (starts at 0).
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Increment the generation counter.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Get the raw generation value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Raw entity index into the entity storage.
pub type EntityId = u32;

/// An opaque handle to an entity.
///
/// Entities own no data themselves; components are attached to them
/// through the [`World`](crate::World).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    /// Index into the entity array.
    id: EntityId,
    /// Generation counter for this slot.
    generation: Generation,
}

impl Entity {
    /// Create a new entity with the given ID and generation.
    #[must_use]
    pub const fn new(id: EntityId, generation: Generation) -> Self {
        Self { id, generation }
    }

    /// Get the entity's index.
    #[must_use]
    pub const fn id(self) -> EntityId {
        self.id
    }

    /// Get the entity's generation.
    #[must_use]
    pub const fn generation(self) -> Generation {
        self.generation
    }

    /// Pack entity into a single u64.
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        ((self.generation.0 as u64) << 32) | (self.id as u64)
    }

    /// Unpack entity from a u64.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            id: bits as u32,
            generation: Generation((bits >> 32) as u32),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.id, self.generation.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.id, self.generation.0)
    }
}

/// State of one entity slot.
#[derive(Clone, Copy, Default)]
struct Slot {
    generation: Generation,
    alive: bool,
}

/// Allocator for entity IDs with generation tracking.
///
/// Maintains a free list of recycled entity slots and tracks
/// the current generation for each slot.
#[derive(Default)]
pub struct EntityAllocator {
    /// Generation and liveness for each entity slot.
    slots: Vec<Slot>,
    /// Free list of available entity IDs; the most recently freed is reused first.
    free_list: Vec<EntityId>,
    /// Number of currently alive entities.
    alive_count: u32,
}

impl EntityAllocator {
    /// Create a new entity allocator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            alive_count: 0,
        }
    }

    /// Create an allocator with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::with_capacity(capacity / 4),
            alive_count: 0,
        }
    }

    /// Allocate a new entity.
    pub fn allocate(&mut self) -> Entity {
        self.alive_count += 1;

        if let Some(id) = self.free_list.pop() {
            // Reuse a recycled slot
            let slot = &mut self.slots[id as usize];
            slot.alive = true;
            Entity::new(id, slot.generation)
        } else {
            // Allocate a new slot
            let id = self.slots.len() as EntityId;
            self.slots.push(Slot {
                generation: Generation::new(),
                alive: true,
            });
            Entity::new(id, Generation::new())
        }
    }

    /// Deallocate an entity, making its slot available for reuse.
    ///
    /// Returns `true` if the entity was valid and deallocated.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        // Increment generation to invalidate existing references
        let slot = &mut self.slots[entity.id() as usize];
        slot.generation = slot.generation.next();
        slot.alive = false;
        self.free_list.push(entity.id());
        self.alive_count -= 1;
        true
    }

    /// Check if an entity is currently alive.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.id() as usize)
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation())
    }

    /// Get the number of currently alive entities.
    #[must_use]
    pub const fn alive_count(&self) -> u32 {
        self.alive_count
    }

    /// Get the total capacity (including recycled slots).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterate over every live entity in index order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .map(|(id, slot)| Entity::new(id as EntityId, slot.generation))
    }
}

/// The set of component shapes currently attached to one entity.
#[derive(Clone, Default, Debug)]
pub struct OwnedTypes(FxHashSet<ComponentId>);

impl OwnedTypes {
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.0.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.0.iter().copied()
    }

    fn insert(&mut self, id: ComponentId) -> bool {
        self.0.insert(id)
    }

    fn remove(&mut self, id: ComponentId) -> bool {
        self.0.remove(&id)
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

/// Entity lifecycle bookkeeping: id allocation plus per-entity owned types.
///
/// Owned-type sets are indexed by entity index and reused across
/// generations so recycling an id never reallocates its set.
#[derive(Default)]
pub struct EntityRegistry {
    allocator: EntityAllocator,
    owned: Vec<OwnedTypes>,
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            allocator: EntityAllocator::with_capacity(capacity),
            owned: Vec::with_capacity(capacity),
        }
    }

    /// Allocate an entity with an empty owned-type set.
    pub fn create(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        let index = entity.id() as usize;

        if index == self.owned.len() {
            self.owned.push(OwnedTypes::default());
        }
        debug_assert!(self.owned[index].is_empty(), "recycled entity kept components");

        entity
    }

    /// Detach the owned-type set of a live entity for the destruction cascade.
    ///
    /// Returns `None` if the entity is not alive. The entity stays allocated
    /// until [`recycle`](Self::recycle) is called with the returned set.
    pub fn retire(&mut self, entity: Entity) -> Option<OwnedTypes> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        Some(std::mem::take(&mut self.owned[entity.id() as usize]))
    }

    /// Finish destroying an entity, handing its (now cleared) set back for reuse.
    pub fn recycle(&mut self, entity: Entity, mut owned: OwnedTypes) {
        owned.clear();
        self.owned[entity.id() as usize] = owned;
        self.allocator.deallocate(entity);
    }

    /// Record that `entity` now carries component `id`.
    pub fn insert_type(&mut self, entity: Entity, id: ComponentId) -> bool {
        self.owned[entity.id() as usize].insert(id)
    }

    /// Record that `entity` no longer carries component `id`.
    pub fn remove_type(&mut self, entity: Entity, id: ComponentId) -> bool {
        self.owned[entity.id() as usize].remove(id)
    }

    /// Owned types of a live entity.
    #[must_use]
    pub fn owned(&self, entity: Entity) -> Option<&OwnedTypes> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.owned.get(entity.id() as usize)
    }

    /// Check whether a live entity carries component `id`.
    #[must_use]
    pub fn has(&self, entity: Entity, id: ComponentId) -> bool {
        self.owned(entity).is_some_and(|owned| owned.contains(id))
    }

    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    #[must_use]
    pub const fn alive_count(&self) -> u32 {
        self.allocator.alive_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.allocator.capacity()
    }

    /// Iterate over every live entity.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.allocator.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_allocation() {
        let mut allocator = EntityAllocator::new();

        let e1 = allocator.allocate();
        let e2 = allocator.allocate();

        assert_eq!(e1.id(), 0);
        assert_eq!(e2.id(), 1);
        assert!(allocator.is_alive(e1));
        assert!(allocator.is_alive(e2));
        assert_eq!(allocator.alive_count(), 2);
    }

    #[test]
    fn test_entity_deallocation() {
        let mut allocator = EntityAllocator::new();

        let e1 = allocator.allocate();
        assert!(allocator.deallocate(e1));
        assert!(!allocator.is_alive(e1));
        assert_eq!(allocator.alive_count(), 0);

        // New allocation reuses the slot but with incremented generation
        let e2 = allocator.allocate();
        assert_eq!(e2.id(), e1.id());
        assert_ne!(e2.generation(), e1.generation());
    }

    #[test]
    fn test_double_deallocation_is_rejected() {
        let mut allocator = EntityAllocator::new();

        let e1 = allocator.allocate();
        assert!(allocator.deallocate(e1));
        assert!(!allocator.deallocate(e1));
        assert_eq!(allocator.alive_count(), 0);
    }

    #[test]
    fn test_recycle_order_is_lifo() {
        let mut allocator = EntityAllocator::new();

        let a = allocator.allocate();
        let b = allocator.allocate();
        allocator.deallocate(a);
        allocator.deallocate(b);

        assert_eq!(allocator.allocate().id(), b.id());
        assert_eq!(allocator.allocate().id(), a.id());
        assert_eq!(allocator.capacity(), 2);
    }

    #[test]
    fn test_iter_skips_dead_slots() {
        let mut allocator = EntityAllocator::new();

        let a = allocator.allocate();
        let b = allocator.allocate();
        let c = allocator.allocate();
        allocator.deallocate(b);

        let alive: Vec<_> = allocator.iter().collect();
        assert_eq!(alive, vec![a, c]);
    }

    #[test]
    fn test_entity_bits_roundtrip() {
        let entity = Entity::new(12345, Generation(67890));
        let bits = entity.to_bits();
        let recovered = Entity::from_bits(bits);
        assert_eq!(entity, recovered);
    }

    #[test]
    fn test_registry_owned_types_reset_on_recycle() {
        let mut registry = EntityRegistry::new();
        let pos = ComponentId::from_raw(0);
        let vel = ComponentId::from_raw(1);

        let e1 = registry.create();
        registry.insert_type(e1, pos);
        registry.insert_type(e1, vel);
        assert!(registry.has(e1, pos));
        assert_eq!(registry.owned(e1).map(OwnedTypes::len), Some(2));

        let owned = registry.retire(e1).unwrap();
        assert_eq!(owned.len(), 2);
        registry.recycle(e1, owned);

        assert!(!registry.is_alive(e1));
        assert!(registry.retire(e1).is_none());

        let e2 = registry.create();
        assert_eq!(e2.id(), e1.id());
        assert!(registry.owned(e2).unwrap().is_empty());
        assert!(!registry.has(e2, pos));
    }
}

//! Directed relations between entities.
//!
//! A relation `(R, from, to)` attaches a payload of shape `R` to an ordered
//! pair of entities. For example:
//! - `(ChildOf, child, parent)` - child belongs to parent
//! - `(Targets, turret, enemy)` - turret is aiming at enemy
//!
//! ```ignore
//! world.relate(child, parent, ChildOf);
//! assert!(world.has_relation::<ChildOf>(child, parent));
//!
//! for parent in world.relations_out::<ChildOf>(child) { /* ... */ }
//! ```
//!
//! Each relation shape gets one [`RelationTable`] laid out like a component
//! table, keyed by the pair instead of a single entity, plus adjacency lists
//! in both directions. Destroying an entity drops every pair it appears in.

use std::fmt;

use bytemuck::Pod;
use smallvec::SmallVec;

use crate::{
    FxHashMap,
    component::Insertion,
    entity::Entity,
    registry::{RelationId, ShapeInfo},
    storage::DenseStore,
};

/// Marker trait for types that can be used as relation payloads.
///
/// Zero-sized marker types work and cost no payload storage.
pub trait Relation: Pod {}

impl<T: Pod> Relation for T {}

/// An ordered `(from, to)` pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pair {
    pub from: Entity,
    pub to: Entity,
}

impl Pair {
    #[must_use]
    pub const fn new(from: Entity, to: Entity) -> Self {
        Self { from, to }
    }
}

impl fmt::Debug for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} -> {})", self.from, self.to)
    }
}

type Adjacency = FxHashMap<Entity, SmallVec<[Entity; 4]>>;

/// Storage for every pair carrying one relation shape.
pub struct RelationTable {
    id: RelationId,
    slots: FxHashMap<Pair, usize>,
    store: DenseStore,
    pairs: Vec<Pair>,
    /// `from` to every `to` it relates to.
    outgoing: Adjacency,
    /// `to` to every `from` relating to it.
    incoming: Adjacency,
}

impl RelationTable {
    #[must_use]
    pub fn new(id: RelationId, info: ShapeInfo) -> Self {
        Self {
            id,
            slots: FxHashMap::default(),
            store: DenseStore::new(info),
            pairs: Vec::new(),
            outgoing: Adjacency::default(),
            incoming: Adjacency::default(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> RelationId {
        self.id
    }

    #[must_use]
    pub const fn info(&self) -> &ShapeInfo {
        self.store.info()
    }

    /// Number of related pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn contains(&self, from: Entity, to: Entity) -> bool {
        self.slots.contains_key(&Pair::new(from, to))
    }

    /// Relate `from` to `to`, overwriting any existing payload for the pair.
    ///
    /// # Panics
    ///
    /// Panics if `R` is not this table's shape.
    pub fn insert<R: Relation>(&mut self, from: Entity, to: Entity, data: R) -> Insertion {
        let pair = Pair::new(from, to);
        if let Some(&slot) = self.slots.get(&pair) {
            self.store.set(slot, data);
            return Insertion::Updated;
        }

        let slot = self.store.push(data);
        self.slots.insert(pair, slot);
        self.pairs.push(pair);
        self.outgoing.entry(from).or_default().push(to);
        self.incoming.entry(to).or_default().push(from);

        Insertion::Added
    }

    /// Drop the relation between `from` and `to`.
    pub fn remove(&mut self, from: Entity, to: Entity) -> bool {
        let pair = Pair::new(from, to);
        let Some(slot) = self.slots.remove(&pair) else {
            return false;
        };

        self.store.swap_remove(slot);
        self.pairs.swap_remove(slot);
        if let Some(&moved) = self.pairs.get(slot) {
            self.slots.insert(moved, slot);
        }

        unlink(&mut self.outgoing, from, to);
        unlink(&mut self.incoming, to, from);
        true
    }

    #[must_use]
    pub fn get<R: Relation>(&self, from: Entity, to: Entity) -> Option<&R> {
        let slot = *self.slots.get(&Pair::new(from, to))?;
        self.store.get(slot)
    }

    pub fn get_mut<R: Relation>(&mut self, from: Entity, to: Entity) -> Option<&mut R> {
        let slot = *self.slots.get(&Pair::new(from, to))?;
        self.store.get_mut(slot)
    }

    /// Every entity `from` relates to, in relate order until a removal.
    #[must_use]
    pub fn outgoing(&self, from: Entity) -> &[Entity] {
        self.outgoing.get(&from).map_or(&[][..], SmallVec::as_slice)
    }

    /// Every entity relating to `to`.
    #[must_use]
    pub fn incoming(&self, to: Entity) -> &[Entity] {
        self.incoming.get(&to).map_or(&[][..], SmallVec::as_slice)
    }

    /// Remove every pair `entity` participates in, in either direction.
    ///
    /// Returns the number of pairs removed.
    pub fn remove_entity(&mut self, entity: Entity) -> usize {
        let targets = self.outgoing.get(&entity).cloned().unwrap_or_default();
        let sources = self.incoming.get(&entity).cloned().unwrap_or_default();

        let mut removed = 0;
        for to in targets {
            removed += usize::from(self.remove(entity, to));
        }
        for from in sources {
            removed += usize::from(self.remove(from, entity));
        }
        removed
    }

    /// Iterate over `(pair, payload)` in slot order.
    pub fn iter<R: Relation>(&self) -> impl Iterator<Item = (Pair, &R)> + '_ {
        self.pairs.iter().copied().zip(self.store.as_slice::<R>())
    }
}

fn unlink(adjacency: &mut Adjacency, key: Entity, value: Entity) {
    let Some(list) = adjacency.get_mut(&key) else {
        return;
    };
    if let Some(position) = list.iter().position(|&e| e == value) {
        list.swap_remove(position);
    }
    if list.is_empty() {
        adjacency.remove(&key);
    }
}

impl fmt::Debug for RelationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationTable")
            .field("id", &self.id)
            .field("shape", &self.info().name())
            .field("pairs", &self.pairs)
            .finish()
    }
}

//! World - the main container for all ECS data.
//!
//! The World owns the type registry, the entity registry, one table per
//! component shape, one queue per message shape, one table per relation
//! shape and every cached query. Tables and queues are created the first
//! time their shape is used.
//!
//! Access contract: reading a component an entity lacks, reading the first
//! message of an empty queue, or touching a destroyed entity is a programmer
//! error. The plain accessors panic with the [`EcsError`] message; the
//! `try_*` twins return it.

use std::{any::type_name, fmt};

use crate::{
    component::{Component, ComponentTable, Insertion},
    entity::{Entity, EntityRegistry, OwnedTypes},
    error::{EcsError, Result},
    message::{Message, MessageQueue},
    query::{Query, QueryBuilder, QueryCache, QueryFilter, QueryRegistry},
    registry::{ComponentId, MessageId, RelationId, ShapeInfo, TypeRegistry},
    relation::{Relation, RelationTable},
};

/// The ECS world - container for all entities, components and messages.
#[derive(Default)]
pub struct World {
    registry: TypeRegistry,
    entities: EntityRegistry,
    /// Indexed by `ComponentId`.
    tables: Vec<ComponentTable>,
    /// Indexed by `MessageId`.
    queues: Vec<MessageQueue>,
    /// Indexed by `RelationId`.
    relations: Vec<RelationTable>,
    queries: QueryRegistry,
    tick: u64,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world with room for `entity_capacity` entities.
    #[must_use]
    pub fn with_capacity(entity_capacity: usize) -> Self {
        Self {
            entities: EntityRegistry::with_capacity(entity_capacity),
            ..Self::default()
        }
    }

    // ==================== Entity Operations ====================

    /// Create a new entity with no components.
    ///
    /// Recently destroyed indices are reused first, under a new generation.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.entities.create();
        if let Some(owned) = self.entities.owned(entity) {
            self.queries.on_created(entity, owned);
        }
        tracing::debug!("created entity {entity}");
        entity
    }

    /// Destroy an entity.
    ///
    /// Removes every component it carries, drops it from every query and
    /// every relation in either direction, then recycles its index.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not alive.
    pub fn destroy(&mut self, entity: Entity) {
        let Some(owned) = self.entities.retire(entity) else {
            panic!("{}", EcsError::DeadEntity(entity));
        };

        self.queries.on_destroyed(entity, &owned);
        for id in owned.iter() {
            self.tables[id.index()].remove(entity);
        }

        let mut unrelated = 0;
        for table in &mut self.relations {
            unrelated += table.remove_entity(entity);
        }

        tracing::debug!(
            "destroyed entity {entity} ({} components, {unrelated} relations)",
            owned.len()
        );
        self.entities.recycle(entity, owned);
    }

    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of live entities.
    #[must_use]
    pub const fn entity_count(&self) -> u32 {
        self.entities.alive_count()
    }

    /// Iterate over every live entity.
    pub fn iter_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    /// Component shapes currently attached to a live entity.
    #[must_use]
    pub fn owned_types(&self, entity: Entity) -> Option<&OwnedTypes> {
        self.entities.owned(entity)
    }

    fn assert_alive(&self, entity: Entity) {
        if !self.entities.is_alive(entity) {
            panic!("{}", EcsError::DeadEntity(entity));
        }
    }

    // ==================== Registration ====================

    #[must_use]
    pub const fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Register a component shape, creating its table on first use.
    pub fn register_component<T: Component>(&mut self) -> ComponentId {
        let id = self.registry.register_component::<T>();
        if id.index() == self.tables.len() {
            tracing::trace!("component table {id:?} for `{}`", type_name::<T>());
            self.tables.push(ComponentTable::new(id, ShapeInfo::of::<T>()));
        }
        id
    }

    /// Register a message shape, creating its queue on first use.
    pub fn register_message<T: Message>(&mut self) -> MessageId {
        let id = self.registry.register_message::<T>();
        if id.index() == self.queues.len() {
            tracing::trace!("message queue {id:?} for `{}`", type_name::<T>());
            self.queues.push(MessageQueue::new(id, ShapeInfo::of::<T>()));
        }
        id
    }

    /// Register a relation shape, creating its table on first use.
    pub fn register_relation<T: Relation>(&mut self) -> RelationId {
        let id = self.registry.register_relation::<T>();
        if id.index() == self.relations.len() {
            tracing::trace!("relation table {id:?} for `{}`", type_name::<T>());
            self.relations.push(RelationTable::new(id, ShapeInfo::of::<T>()));
        }
        id
    }

    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.registry.component_id::<T>()
    }

    #[must_use]
    pub fn message_id<T: Message>(&self) -> Option<MessageId> {
        self.registry.message_id::<T>()
    }

    #[must_use]
    pub fn relation_id<T: Relation>(&self) -> Option<RelationId> {
        self.registry.relation_id::<T>()
    }

    // ==================== Component Operations ====================

    /// Attach a component, overwriting any existing value of the same shape.
    ///
    /// Only [`Insertion::Added`] is a structural change; overwriting leaves
    /// every query untouched.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not alive.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Insertion {
        self.assert_alive(entity);
        let id = self.register_component::<T>();

        let insertion = self.tables[id.index()].insert(entity, component);
        if insertion.is_added() {
            self.entities.insert_type(entity, id);
            self.notify(id, entity);
        }
        insertion
    }

    /// Detach a component. Returns `false` if the entity did not carry it.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not alive.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> bool {
        self.assert_alive(entity);
        let Some(id) = self.component_id::<T>() else {
            return false;
        };

        if !self.tables[id.index()].remove(entity) {
            return false;
        }
        self.entities.remove_type(entity, id);
        self.notify(id, entity);
        true
    }

    fn notify(&mut self, id: ComponentId, entity: Entity) {
        if let Some(owned) = self.entities.owned(entity) {
            self.queries.on_structural_change(id, entity, owned);
        }
    }

    /// Read a component.
    ///
    /// # Panics
    ///
    /// Panics if the entity is dead or lacks `T`.
    #[must_use]
    pub fn component<T: Component>(&self, entity: Entity) -> &T {
        self.try_component(entity).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Read a component, reporting a contract violation as an error.
    pub fn try_component<T: Component>(&self, entity: Entity) -> Result<&T> {
        if !self.entities.is_alive(entity) {
            return Err(EcsError::DeadEntity(entity));
        }
        self.component_id::<T>()
            .and_then(|id| self.tables[id.index()].get(entity))
            .ok_or_else(|| EcsError::MissingComponent {
                entity,
                name: type_name::<T>(),
            })
    }

    /// Mutate a component in place.
    ///
    /// # Panics
    ///
    /// Panics if the entity is dead or lacks `T`.
    pub fn component_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        self.try_component_mut(entity)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// Mutate a component in place, reporting a contract violation as an error.
    pub fn try_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        if !self.entities.is_alive(entity) {
            return Err(EcsError::DeadEntity(entity));
        }
        let missing = EcsError::MissingComponent {
            entity,
            name: type_name::<T>(),
        };
        match self.component_id::<T>() {
            Some(id) => self.tables[id.index()].get_mut(entity).ok_or(missing),
            None => Err(missing),
        }
    }

    /// Check whether a live entity carries `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.component_id::<T>()
            .is_some_and(|id| self.entities.has(entity, id))
    }

    /// Check whether a live entity carries the component with this id.
    #[must_use]
    pub fn has_component_id(&self, entity: Entity, id: ComponentId) -> bool {
        self.entities.has(entity, id)
    }

    /// The table for `T`, if the shape was ever used.
    #[must_use]
    pub fn table<T: Component>(&self) -> Option<&ComponentTable> {
        self.component_id::<T>()
            .map(|id| &self.tables[id.index()])
    }

    /// The table for a component id.
    #[must_use]
    pub fn table_by_id(&self, id: ComponentId) -> Option<&ComponentTable> {
        self.tables.get(id.index())
    }

    // ==================== Query ====================

    /// Start building a cached query.
    pub fn query(&mut self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    /// Create or reuse the cached query for an include/exclude predicate.
    ///
    /// Order and duplicates in either list do not matter.
    pub fn build_query(&mut self, includes: &[ComponentId], excludes: &[ComponentId]) -> Query {
        self.build_query_filter(QueryFilter::new(
            includes.iter().copied(),
            excludes.iter().copied(),
        ))
    }

    pub(crate) fn build_query_filter(&mut self, filter: QueryFilter) -> Query {
        if let Some(query) = self.queries.find(&filter) {
            return query;
        }

        tracing::trace!(
            "query {} over {:?} without {:?}",
            self.queries.len(),
            filter.includes(),
            filter.excludes()
        );
        let query = self.queries.insert(filter);
        self.seed(query);
        query
    }

    /// Fill a fresh cache from the smallest include table, or from every live
    /// entity when nothing is included. Runs once per cache.
    fn seed(&mut self, query: Query) {
        let cache = self.queries.get_mut(query);
        let includes = cache.filter().includes();

        let candidates: Vec<Entity> = if includes.is_empty() {
            self.entities.iter().collect()
        } else {
            includes
                .iter()
                .map(|id| {
                    self.tables
                        .get(id.index())
                        .map_or(&[][..], ComponentTable::entities)
                })
                .min_by_key(|entities| entities.len())
                .unwrap_or_default()
                .to_vec()
        };

        for entity in candidates {
            if let Some(owned) = self.entities.owned(entity) {
                cache.update(entity, owned);
            }
        }
    }

    /// Entities currently matching a query.
    #[must_use]
    pub fn entities(&self, query: Query) -> &[Entity] {
        self.queries.get(query).entities()
    }

    #[must_use]
    pub fn query_cache(&self, query: Query) -> &QueryCache {
        self.queries.get(query)
    }

    /// Number of distinct cached queries.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    // ==================== Message Operations ====================

    /// Queue a message for every reader this tick.
    pub fn send_message<T: Message>(&mut self, message: T) {
        let id = self.register_message::<T>();
        self.queues[id.index()].send(message);
    }

    /// Every `T` sent since the last refresh, in send order.
    ///
    /// Empty if no `T` was ever sent.
    #[must_use]
    pub fn receive_all_messages<T: Message>(&self) -> &[T] {
        self.message_queue::<T>()
            .map_or(&[][..], MessageQueue::read_all::<T>)
    }

    /// The first `T` sent since the last refresh.
    ///
    /// # Panics
    ///
    /// Panics if no `T` was sent this tick.
    #[must_use]
    pub fn receive_first_message<T: Message>(&self) -> &T {
        self.try_receive_first_message()
            .unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn try_receive_first_message<T: Message>(&self) -> Result<&T> {
        self.message_queue::<T>()
            .and_then(MessageQueue::first::<T>)
            .ok_or_else(|| EcsError::EmptyMessages {
                name: type_name::<T>(),
            })
    }

    /// Whether no `T` was sent since the last refresh.
    #[must_use]
    pub fn is_empty_messages<T: Message>(&self) -> bool {
        self.message_queue::<T>().is_none_or(MessageQueue::is_empty)
    }

    #[must_use]
    pub fn message_queue<T: Message>(&self) -> Option<&MessageQueue> {
        self.message_id::<T>()
            .map(|id| &self.queues[id.index()])
    }

    // ==================== Relation Operations ====================

    /// Relate `from` to `to`, overwriting any existing `R` payload for the pair.
    ///
    /// # Panics
    ///
    /// Panics if either entity is not alive.
    pub fn relate<R: Relation>(&mut self, from: Entity, to: Entity, data: R) -> Insertion {
        self.assert_alive(from);
        self.assert_alive(to);
        let id = self.register_relation::<R>();
        self.relations[id.index()].insert(from, to, data)
    }

    /// Drop the `R` relation from `from` to `to`. Returns `false` if absent.
    pub fn unrelate<R: Relation>(&mut self, from: Entity, to: Entity) -> bool {
        match self.relation_id::<R>() {
            Some(id) => self.relations[id.index()].remove(from, to),
            None => false,
        }
    }

    #[must_use]
    pub fn has_relation<R: Relation>(&self, from: Entity, to: Entity) -> bool {
        self.relation_table::<R>()
            .is_some_and(|table| table.contains(from, to))
    }

    /// Read the payload of a relation.
    ///
    /// # Panics
    ///
    /// Panics if `from` does not relate to `to` through `R`.
    #[must_use]
    pub fn relation<R: Relation>(&self, from: Entity, to: Entity) -> &R {
        self.try_relation(from, to)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn try_relation<R: Relation>(&self, from: Entity, to: Entity) -> Result<&R> {
        self.relation_table::<R>()
            .and_then(|table| table.get(from, to))
            .ok_or_else(|| EcsError::MissingRelation {
                from,
                to,
                name: type_name::<R>(),
            })
    }

    pub fn try_relation_mut<R: Relation>(&mut self, from: Entity, to: Entity) -> Result<&mut R> {
        let missing = EcsError::MissingRelation {
            from,
            to,
            name: type_name::<R>(),
        };
        match self.relation_id::<R>() {
            Some(id) => self.relations[id.index()].get_mut(from, to).ok_or(missing),
            None => Err(missing),
        }
    }

    /// Every entity `from` relates to through `R`.
    #[must_use]
    pub fn relations_out<R: Relation>(&self, from: Entity) -> &[Entity] {
        self.relation_table::<R>()
            .map_or(&[][..], |table| table.outgoing(from))
    }

    /// Every entity relating to `to` through `R`.
    #[must_use]
    pub fn relations_in<R: Relation>(&self, to: Entity) -> &[Entity] {
        self.relation_table::<R>()
            .map_or(&[][..], |table| table.incoming(to))
    }

    #[must_use]
    pub fn relation_table<R: Relation>(&self) -> Option<&RelationTable> {
        self.relation_id::<R>()
            .map(|id| &self.relations[id.index()])
    }

    // ==================== Tick ====================

    /// End the current tick: every message queue is emptied.
    pub fn refresh(&mut self) {
        for queue in &mut self.queues {
            queue.clear();
        }
        self.tick += 1;
        tracing::trace!("refreshed world, tick {}", self.tick);
    }

    /// Number of completed refreshes.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entity_count())
            .field("components", &self.tables.len())
            .field("messages", &self.queues.len())
            .field("relations", &self.relations.len())
            .field("queries", &self.queries.len())
            .field("tick", &self.tick)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::{Pod, Zeroable};

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Health(u32);

    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Damage {
        amount: u32,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Follows {
        distance: f32,
    }

    #[test]
    fn test_create_and_get() {
        let mut world = World::new();

        let entity = world.create_entity();
        let insertion = world.add_component(entity, Position { x: 1.0, y: 2.0 });

        assert_eq!(insertion, Insertion::Added);
        assert!(world.is_alive(entity));
        assert_eq!(world.component::<Position>(entity), &Position { x: 1.0, y: 2.0 });
    }

    #[test]
    fn test_overwrite_keeps_table_length() {
        let mut world = World::new();
        let entity = world.create_entity();

        world.add_component(entity, Health(10));
        let insertion = world.add_component(entity, Health(3));

        assert_eq!(insertion, Insertion::Updated);
        assert_eq!(world.table::<Health>().map(ComponentTable::len), Some(1));
        assert_eq!(world.component::<Health>(entity), &Health(3));
    }

    #[test]
    fn test_component_mut() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, Health(10));

        world.component_mut::<Health>(entity).0 -= 4;

        assert_eq!(world.component::<Health>(entity).0, 6);
    }

    #[test]
    fn test_remove_component() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, Position { x: 0.0, y: 0.0 });
        world.add_component(entity, Velocity { x: 1.0, y: 1.0 });

        assert!(world.remove_component::<Velocity>(entity));
        assert!(!world.remove_component::<Velocity>(entity));
        assert!(!world.remove_component::<Health>(entity));

        assert!(world.has_component::<Position>(entity));
        assert!(!world.has_component::<Velocity>(entity));
    }

    #[test]
    fn test_swap_remove_integrity() {
        let mut world = World::new();
        let entities: Vec<_> = (0..5).map(|_| world.create_entity()).collect();
        for (i, &e) in entities.iter().enumerate() {
            world.add_component(e, Health(i as u32));
        }

        world.remove_component::<Health>(entities[1]);

        for (i, &e) in entities.iter().enumerate() {
            if i == 1 {
                assert!(world.try_component::<Health>(e).is_err());
            } else {
                assert_eq!(world.component::<Health>(e), &Health(i as u32));
            }
        }
    }

    #[test]
    fn test_destroy() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, Position { x: 1.0, y: 2.0 });

        world.destroy(entity);

        assert!(!world.is_alive(entity));
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.table::<Position>().map(ComponentTable::len), Some(0));
        assert_eq!(
            world.try_component::<Position>(entity),
            Err(EcsError::DeadEntity(entity))
        );
    }

    #[test]
    fn test_recycled_entity_starts_empty() {
        let mut world = World::new();
        let first = world.create_entity();
        world.add_component(first, Health(1));
        world.destroy(first);

        let second = world.create_entity();

        assert_eq!(second.id(), first.id());
        assert_ne!(second, first);
        assert!(!world.has_component::<Health>(second));
        assert!(world.owned_types(second).is_some_and(OwnedTypes::is_empty));
    }

    #[test]
    #[should_panic(expected = "is not alive")]
    fn test_double_destroy_panics() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.destroy(entity);
        world.destroy(entity);
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn test_missing_component_panics() {
        let mut world = World::new();
        let entity = world.create_entity();
        let _ = world.component::<Position>(entity);
    }

    #[test]
    fn test_try_component_reports_missing() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, Health(1));

        let err = world.try_component::<Position>(entity).unwrap_err();

        assert!(matches!(err, EcsError::MissingComponent { entity: e, .. } if e == entity));
        assert!(world.try_component_mut::<Position>(entity).is_err());
    }

    #[test]
    fn test_has_component_id() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, Velocity { x: 0.0, y: 0.0 });
        let id = world.component_id::<Velocity>().unwrap();

        assert!(world.has_component_id(entity, id));
        world.remove_component::<Velocity>(entity);
        assert!(!world.has_component_id(entity, id));
    }

    #[test]
    fn test_messages_broadcast_until_refresh() {
        let mut world = World::new();

        world.send_message(Damage { amount: 5 });
        world.send_message(Damage { amount: 5 });

        let total: u32 = world
            .receive_all_messages::<Damage>()
            .iter()
            .map(|d| d.amount)
            .sum();
        assert_eq!(total, 10);
        assert_eq!(world.receive_all_messages::<Damage>().len(), 2);
        assert_eq!(world.receive_first_message::<Damage>().amount, 5);

        world.refresh();

        assert!(world.is_empty_messages::<Damage>());
        assert!(world.receive_all_messages::<Damage>().is_empty());
        assert_eq!(world.tick(), 1);
    }

    #[test]
    fn test_unsent_message_type_is_empty() {
        let world = World::new();

        assert!(world.is_empty_messages::<Damage>());
        assert!(world.receive_all_messages::<Damage>().is_empty());
        assert_eq!(
            world.try_receive_first_message::<Damage>(),
            Err(EcsError::EmptyMessages {
                name: type_name::<Damage>()
            })
        );
    }

    #[test]
    #[should_panic(expected = "message was sent")]
    fn test_receive_first_on_empty_panics() {
        let mut world = World::new();
        world.send_message(Damage { amount: 1 });
        world.refresh();
        let _ = world.receive_first_message::<Damage>();
    }

    #[test]
    fn test_relations() {
        let mut world = World::new();
        let leader = world.create_entity();
        let a = world.create_entity();
        let b = world.create_entity();

        world.relate(a, leader, Follows { distance: 1.0 });
        world.relate(b, leader, Follows { distance: 2.0 });

        assert!(world.has_relation::<Follows>(a, leader));
        assert!(!world.has_relation::<Follows>(leader, a));
        assert_eq!(world.relation::<Follows>(b, leader).distance, 2.0);
        assert_eq!(world.relations_out::<Follows>(a), &[leader]);
        assert_eq!(world.relations_in::<Follows>(leader).len(), 2);

        if let Ok(follows) = world.try_relation_mut::<Follows>(a, leader) {
            follows.distance = 0.5;
        }
        assert_eq!(world.relation::<Follows>(a, leader).distance, 0.5);

        assert!(world.unrelate::<Follows>(a, leader));
        assert!(!world.unrelate::<Follows>(a, leader));
        assert_eq!(world.relations_in::<Follows>(leader), &[b]);
    }

    #[test]
    fn test_destroy_cascades_relations() {
        let mut world = World::new();
        let leader = world.create_entity();
        let a = world.create_entity();
        let b = world.create_entity();
        world.relate(a, leader, Follows { distance: 1.0 });
        world.relate(leader, b, Follows { distance: 1.0 });

        world.destroy(leader);

        assert!(world.relations_out::<Follows>(a).is_empty());
        assert!(world.relations_in::<Follows>(b).is_empty());
        assert!(world.relation_table::<Follows>().is_some_and(RelationTable::is_empty));
    }

    #[test]
    fn test_multiple_entities() {
        let mut world = World::with_capacity(64);

        let entities: Vec<_> = (0..64)
            .map(|i| {
                let e = world.create_entity();
                world.add_component(e, Position { x: i as f32, y: 0.0 });
                e
            })
            .collect();

        for (i, &e) in entities.iter().enumerate() {
            assert_eq!(world.component::<Position>(e).x, i as f32);
        }
        assert_eq!(world.entity_count(), 64);
        assert_eq!(world.iter_entities().count(), 64);
    }
}

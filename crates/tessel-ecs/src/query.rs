//! Cached queries over component predicates.
//!
//! A query is an include/exclude predicate over component ids. Building a
//! query creates (or reuses) a [`QueryCache`] holding the live list of
//! matching entities. The cache is registered against every id in its
//! predicate and re-checks one entity at a time when that entity gains or
//! loses one of those components, so iteration never scans the world.
//!
//! # Basic Usage
//!
//! ```ignore
//! let movers = world.query().with::<Position>().with::<Velocity>().build();
//!
//! for entity in movers.iter(&world) {
//!     let vel = *world.component::<Velocity>(entity);
//!     world.component_mut::<Position>(entity).x += vel.x;
//! }
//! ```
//!
//! Iterating while mutating components needs a copy of the list when the
//! loop borrows the world mutably; see [`Query::to_vec`].
//!
//! # Query Combinators
//!
//! - `.with::<T>()` - Entity must have component T
//! - `.without::<T>()` - Entity must NOT have component T

use smallvec::SmallVec;

use crate::{
    FxHashMap, World,
    component::Component,
    entity::{Entity, OwnedTypes},
    registry::ComponentId,
};

// ============================================================================
// Filter
// ============================================================================

type IdList = SmallVec<[ComponentId; 4]>;

/// Canonical include/exclude predicate.
///
/// Both lists are kept sorted and deduplicated, so two filters describing
/// the same sets compare and hash equal regardless of construction order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct QueryFilter {
    includes: IdList,
    excludes: IdList,
}

impl QueryFilter {
    #[must_use]
    pub fn new(
        includes: impl IntoIterator<Item = ComponentId>,
        excludes: impl IntoIterator<Item = ComponentId>,
    ) -> Self {
        Self {
            includes: canonical(includes),
            excludes: canonical(excludes),
        }
    }

    /// Components an entity must carry.
    #[must_use]
    pub fn includes(&self) -> &[ComponentId] {
        &self.includes
    }

    /// Components an entity must not carry.
    #[must_use]
    pub fn excludes(&self) -> &[ComponentId] {
        &self.excludes
    }

    /// Every id whose presence affects the outcome.
    pub fn terms(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.includes.iter().chain(&self.excludes).copied()
    }

    /// Full predicate check against an entity's owned types.
    #[must_use]
    pub fn matches(&self, owned: &OwnedTypes) -> bool {
        self.includes.iter().all(|&id| owned.contains(id))
            && !self.excludes.iter().any(|&id| owned.contains(id))
    }
}

fn canonical(ids: impl IntoIterator<Item = ComponentId>) -> IdList {
    let mut ids: IdList = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

// ============================================================================
// QueryCache
// ============================================================================

/// Live list of the entities currently matching one filter.
///
/// Order is insertion order, except that removal swaps the last entity into
/// the vacated position.
#[derive(Debug)]
pub struct QueryCache {
    filter: QueryFilter,
    entities: Vec<Entity>,
    positions: FxHashMap<Entity, usize>,
}

impl QueryCache {
    fn new(filter: QueryFilter) -> Self {
        Self {
            filter,
            entities: Vec::new(),
            positions: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.positions.contains_key(&entity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Re-check the whole predicate for one entity and fix its membership.
    pub(crate) fn update(&mut self, entity: Entity, owned: &OwnedTypes) {
        if self.filter.matches(owned) {
            self.insert(entity);
        } else {
            self.remove(entity);
        }
    }

    fn insert(&mut self, entity: Entity) -> bool {
        if self.positions.contains_key(&entity) {
            return false;
        }
        self.positions.insert(entity, self.entities.len());
        self.entities.push(entity);
        true
    }

    pub(crate) fn remove(&mut self, entity: Entity) -> bool {
        let Some(position) = self.positions.remove(&entity) else {
            return false;
        };

        self.entities.swap_remove(position);
        if let Some(&moved) = self.entities.get(position) {
            self.positions.insert(moved, position);
        }
        true
    }
}

// ============================================================================
// Query handle
// ============================================================================

/// Handle to a cached query.
///
/// Handles are cheap to copy and stay valid for the lifetime of the world
/// that built them. Content-equal predicates yield equal handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Query(u32);

impl Query {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Matching entities, borrowed from the world.
    #[must_use]
    pub fn entities(self, world: &World) -> &[Entity] {
        world.entities(self)
    }

    /// Iterate over matching entities.
    pub fn iter(self, world: &World) -> std::iter::Copied<std::slice::Iter<'_, Entity>> {
        self.entities(world).iter().copied()
    }

    /// Copy of the matching entities, for loops that mutate the world.
    #[must_use]
    pub fn to_vec(self, world: &World) -> Vec<Entity> {
        self.entities(world).to_vec()
    }

    #[must_use]
    pub fn len(self, world: &World) -> usize {
        self.entities(world).len()
    }

    #[must_use]
    pub fn is_empty(self, world: &World) -> bool {
        self.entities(world).is_empty()
    }

    #[must_use]
    pub fn contains(self, world: &World, entity: Entity) -> bool {
        world.query_cache(self).contains(entity)
    }
}

// ============================================================================
// QueryRegistry
// ============================================================================

/// Every cache a world has built, plus the reverse index used to route
/// structural changes to the caches that care.
#[derive(Debug, Default)]
pub struct QueryRegistry {
    caches: Vec<QueryCache>,
    by_filter: FxHashMap<QueryFilter, Query>,
    /// Caches to notify, indexed by component id.
    watchers: Vec<SmallVec<[Query; 4]>>,
    /// Caches with an empty include list, which every new entity may join.
    open: SmallVec<[Query; 4]>,
}

impl QueryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct caches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    #[must_use]
    pub fn get(&self, query: Query) -> &QueryCache {
        &self.caches[query.index()]
    }

    pub(crate) fn get_mut(&mut self, query: Query) -> &mut QueryCache {
        &mut self.caches[query.index()]
    }

    /// Look up the cache for a filter.
    #[must_use]
    pub fn find(&self, filter: &QueryFilter) -> Option<Query> {
        self.by_filter.get(filter).copied()
    }

    /// Create an empty cache for a filter not seen before and register it
    /// against every id in the predicate. The caller seeds it.
    pub(crate) fn insert(&mut self, filter: QueryFilter) -> Query {
        debug_assert!(!self.by_filter.contains_key(&filter));

        let query = Query(self.caches.len() as u32);
        for id in filter.terms() {
            if id.index() >= self.watchers.len() {
                self.watchers.resize_with(id.index() + 1, SmallVec::new);
            }
            self.watchers[id.index()].push(query);
        }
        if filter.includes().is_empty() {
            self.open.push(query);
        }

        self.by_filter.insert(filter.clone(), query);
        self.caches.push(QueryCache::new(filter));
        query
    }

    /// Component `id` was added to or removed from `entity`.
    pub(crate) fn on_structural_change(
        &mut self,
        id: ComponentId,
        entity: Entity,
        owned: &OwnedTypes,
    ) {
        let Some(watchers) = self.watchers.get(id.index()) else {
            return;
        };
        for query in watchers {
            self.caches[query.index()].update(entity, owned);
        }
    }

    /// A componentless entity was created.
    pub(crate) fn on_created(&mut self, entity: Entity, owned: &OwnedTypes) {
        for query in &self.open {
            self.caches[query.index()].update(entity, owned);
        }
    }

    /// `entity` is being destroyed while owning `owned`.
    pub(crate) fn on_destroyed(&mut self, entity: Entity, owned: &OwnedTypes) {
        for id in owned.iter() {
            if let Some(watchers) = self.watchers.get(id.index()) {
                for query in watchers {
                    self.caches[query.index()].remove(entity);
                }
            }
        }
        for query in &self.open {
            self.caches[query.index()].remove(entity);
        }
    }
}

// ============================================================================
// QueryBuilder - Runtime Builder Pattern
// ============================================================================

/// Builder for cached queries.
///
/// Component shapes named here are registered on first use, so a query may
/// be built before any entity carries them.
pub struct QueryBuilder<'w> {
    world: &'w mut World,
    includes: IdList,
    excludes: IdList,
}

impl<'w> QueryBuilder<'w> {
    pub fn new(world: &'w mut World) -> Self {
        Self {
            world,
            includes: IdList::new(),
            excludes: IdList::new(),
        }
    }

    /// Entity must have component `T`.
    #[must_use]
    pub fn with<T: Component>(mut self) -> Self {
        let id = self.world.register_component::<T>();
        self.includes.push(id);
        self
    }

    /// Entity must NOT have component `T`.
    #[must_use]
    pub fn without<T: Component>(mut self) -> Self {
        let id = self.world.register_component::<T>();
        self.excludes.push(id);
        self
    }

    /// Entity must have the component with this id.
    #[must_use]
    pub fn with_id(mut self, id: ComponentId) -> Self {
        self.includes.push(id);
        self
    }

    /// Entity must NOT have the component with this id.
    #[must_use]
    pub fn without_id(mut self, id: ComponentId) -> Self {
        self.excludes.push(id);
        self
    }

    /// Create or reuse the cache for this predicate.
    pub fn build(self) -> Query {
        self.world
            .build_query_filter(QueryFilter::new(self.includes, self.excludes))
    }
}

impl core::fmt::Debug for QueryBuilder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("includes", &self.includes)
            .field("excludes", &self.excludes)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

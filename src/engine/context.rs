//! Execution context handed to running systems.
//!
//! Systems never receive the store directly. `SystemContext` exposes the
//! operations that are safe while query iteration may be in flight on the
//! same tick:
//!
//! * entity creation is **immediate**, because a fresh entity lands in the
//!   empty archetype and cannot invalidate any matched iteration,
//! * component adds/removes and entity destruction are **deferred** into
//!   the store's buffers and applied at the next flush boundary,
//! * field reads and writes are immediate, as is query construction.
//!
//! A manual [`SystemContext::flush`] is permitted; it applies the buffers
//! on the spot and therefore invalidates any column reference the caller
//! still holds.

use crate::engine::archetype::Archetype;
use crate::engine::error::EcsResult;
use crate::engine::query::Query;
use crate::engine::store::Store;
use crate::engine::types::{ComponentId, Entity};

/// Curated store access for system code.
pub struct SystemContext<'a> {
    store: &'a mut Store,
}

impl<'a> SystemContext<'a> {
    /// Wraps a store for the duration of one system invocation.
    pub fn new(store: &'a mut Store) -> Self {
        Self { store }
    }

    /// Creates a live entity immediately.
    pub fn create_entity(&mut self) -> EcsResult<Entity> {
        self.store.create_entity()
    }

    /// Returns `true` if the handle refers to a live entity.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.store.is_alive(entity)
    }

    /// Queues a component add for the next flush boundary.
    pub fn add_component(
        &mut self,
        entity: Entity,
        component: ComponentId,
        values: &[f64],
    ) -> EcsResult<()> {
        self.store.add_component_deferred(entity, component, values)
    }

    /// Queues a component removal for the next flush boundary.
    pub fn remove_component(&mut self, entity: Entity, component: ComponentId) -> EcsResult<()> {
        self.store.remove_component_deferred(entity, component)
    }

    /// Queues an entity destruction for the next flush boundary.
    pub fn destroy_entity(&mut self, entity: Entity) {
        self.store.destroy_entity_deferred(entity);
    }

    /// Returns `true` if the live entity currently has `component`.
    pub fn has_component(&self, entity: Entity, component: ComponentId) -> EcsResult<bool> {
        self.store.has_component(entity, component)
    }

    /// Reads one component field immediately.
    pub fn get_field(
        &self,
        entity: Entity,
        component: ComponentId,
        field: usize,
    ) -> EcsResult<f64> {
        self.store.get_field(entity, component, field)
    }

    /// Writes one component field immediately.
    pub fn set_field(
        &mut self,
        entity: Entity,
        component: ComponentId,
        field: usize,
        value: f64,
    ) -> EcsResult<()> {
        self.store.set_field(entity, component, field, value)
    }

    /// Interns a query over the included components.
    pub fn query(&mut self, components: &[ComponentId]) -> EcsResult<Query> {
        self.store.query(components)
    }

    /// Widens a query's include set.
    pub fn query_and(&mut self, query: Query, components: &[ComponentId]) -> EcsResult<Query> {
        self.store.query_and(query, components)
    }

    /// Widens a query's exclude set.
    pub fn query_not(&mut self, query: Query, components: &[ComponentId]) -> EcsResult<Query> {
        self.store.query_not(query, components)
    }

    /// Widens a query's any-of set.
    pub fn query_or(&mut self, query: Query, components: &[ComponentId]) -> EcsResult<Query> {
        self.store.query_or(query, components)
    }

    /// Invokes `f` once per non-empty matched archetype.
    pub fn each<F>(&mut self, query: Query, f: F) -> EcsResult<()>
    where
        F: FnMut(&mut Archetype) -> EcsResult<()>,
    {
        self.store.each(query, f)
    }

    /// Applies the deferred buffers now instead of at the phase boundary.
    ///
    /// Any column reference obtained before this call must be considered
    /// invalid afterwards.
    pub fn flush(&mut self) -> EcsResult<()> {
        self.store.flush()
    }
}

//! Central store: ownership, structural mutation, and flushing.
//!
//! The `Store` is the single owner of the entity allocator, the component
//! registry, the archetype registry, the query engine, the slot-to-archetype
//! map, and the three deferred mutation buffers. All structural changes
//! route through it so the bookkeeping invariants hold at every observable
//! point:
//!
//! * every live entity belongs to exactly one archetype (the empty
//!   archetype at birth),
//! * an entity's archetype, its row, and the dense/sparse membership maps
//!   agree,
//! * query result lists learn about every archetype the store creates.
//!
//! ## Immediate versus deferred
//!
//! Immediate operations mutate archetypes on the spot and are meant for use
//! outside a running system. Systems queue structural changes instead;
//! the queued work is applied by [`Store::flush`] in a fixed order that is
//! part of the engine's contract:
//!
//! 1. all buffered component **adds**, in insertion order,
//! 2. all buffered component **removes**, in insertion order,
//! 3. all buffered entity **destroys**.
//!
//! Buffered entries capture the generational entity handle; entries whose
//! entity has died by apply time are skipped silently. This permissiveness
//! is deliberate: one system may destroy an entity for which another system
//! queued work in the same phase.
//!
//! ## Entity moves
//!
//! Adding or removing a component moves the entity between archetypes: the
//! destination row is appended, shared column values are copied across by a
//! merge walk of the two sorted signatures, newly added fields are written,
//! and the source row is swap-and-popped. The slot map is updated last.

use tracing::trace;

use crate::engine::archetype::Archetype;
use crate::engine::bitset::Bitset;
use crate::engine::commands::{DeferredAdd, DeferredRemove};
use crate::engine::component::{ComponentRegistry, Schema};
use crate::engine::entity::EntityAllocator;
use crate::engine::error::{AccessError, AllocError, EcsResult, MembershipError};
use crate::engine::query::{Query, QueryEngine};
use crate::engine::registry::ArchetypeRegistry;
use crate::engine::types::{ArchetypeId, ComponentId, Entity, Row, SlotIndex};

/// Single owner of all engine state.
pub struct Store {
    allocator: EntityAllocator,
    components: ComponentRegistry,
    archetypes: ArchetypeRegistry,
    queries: QueryEngine,
    /// Slot-indexed map to the owning archetype; stale for dead slots.
    entity_archetype: Vec<ArchetypeId>,
    pending_adds: Vec<DeferredAdd>,
    pending_removes: Vec<DeferredRemove>,
    pending_destroys: Vec<Entity>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates a store holding only the empty archetype.
    pub fn new() -> Self {
        let components = ComponentRegistry::new();
        let archetypes = ArchetypeRegistry::new(&components);
        Self {
            allocator: EntityAllocator::new(),
            components,
            archetypes,
            queries: QueryEngine::new(),
            entity_archetype: Vec::new(),
            pending_adds: Vec::new(),
            pending_removes: Vec::new(),
            pending_destroys: Vec::new(),
        }
    }

    // ── registration ────────────────────────────────────────────────────

    /// Registers a component schema and returns its handle.
    pub fn register_component(&mut self, schema: Schema) -> ComponentId {
        self.components.register(schema)
    }

    /// Registers a field-less tag component.
    pub fn register_tag(&mut self, name: impl Into<String>) -> ComponentId {
        self.components.register_tag(name)
    }

    /// Borrows the component registry, including the slot-indexed mirror
    /// columns.
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    // ── entity lifecycle ────────────────────────────────────────────────

    /// Creates a live entity in the empty archetype.
    pub fn create_entity(&mut self) -> EcsResult<Entity> {
        let entity = self.allocator.create()?;
        let slot = entity.slot() as usize;
        if slot >= self.entity_archetype.len() {
            let target = (slot + 1).max(self.entity_archetype.len() * 2);
            self.entity_archetype.resize(target, 0);
        }
        let empty = self.archetypes.empty_id();
        self.entity_archetype[slot] = empty;
        self.archetypes.archetype_mut(empty).add_entity(entity, entity.slot());
        Ok(entity)
    }

    /// Returns `true` if the handle refers to a live entity.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.live_count()
    }

    /// Number of archetypes ever created, the empty one included.
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Destroys an entity immediately: swap-and-pops it out of its
    /// archetype, retires the slot, and poisons the slot's mirror columns.
    ///
    /// ## Errors
    /// `DoubleDestroy` when the handle is not alive.
    pub fn destroy_entity(&mut self, entity: Entity) -> EcsResult<()> {
        if !self.allocator.is_alive(entity) {
            return Err(AllocError::DoubleDestroy { entity }.into());
        }
        let slot = entity.slot();
        let archetype_id = self.entity_archetype[slot as usize];
        let archetype = self.archetypes.archetype_mut(archetype_id);
        let signature: Vec<ComponentId> = archetype.signature().to_vec();
        archetype.remove_entity(slot)?;
        self.allocator.destroy(entity)?;
        for component in signature {
            let _ = self.components.clear(component, slot);
        }
        Ok(())
    }

    /// Queues an entity destruction for the next flush. Entries whose
    /// entity has already died by then are skipped.
    pub fn destroy_entity_deferred(&mut self, entity: Entity) {
        self.pending_destroys.push(entity);
    }

    // ── component access ────────────────────────────────────────────────

    /// Returns `true` if the live entity currently has `component`.
    ///
    /// ## Errors
    /// `DeadEntity` for a stale handle, `UnknownComponent` for an
    /// unregistered handle.
    pub fn has_component(&self, entity: Entity, component: ComponentId) -> EcsResult<bool> {
        self.check_alive(entity)?;
        self.components.check(component)?;
        let archetype = self.archetypes.archetype(self.entity_archetype[entity.slot() as usize]);
        Ok(archetype.has_component(component))
    }

    /// Adds a component to an entity, writing one value per schema field.
    ///
    /// ## Behavior
    /// - If the entity already has the component, the fields are
    ///   overwritten in place and no move occurs.
    /// - Otherwise the transition edge is resolved, the entity moves to the
    ///   target archetype (shared columns copied by a sorted merge walk),
    ///   and the new component's fields are written at the new row.
    ///
    /// The registry's slot-indexed mirror is written through either way.
    ///
    /// ## Errors
    /// `DeadEntity`, `UnknownComponent`, or `FieldCountMismatch`.
    pub fn add_component(
        &mut self,
        entity: Entity,
        component: ComponentId,
        values: &[f64],
    ) -> EcsResult<()> {
        self.check_alive(entity)?;
        self.check_arity(component, values)?;

        let slot = entity.slot();
        let source_id = self.entity_archetype[slot as usize];

        if self.archetypes.archetype(source_id).has_component(component) {
            self.write_fields(source_id, slot, component, values)?;
            self.components.set(component, slot, values)?;
            return Ok(());
        }

        let (target_id, created) =
            self.archetypes.resolve_add(source_id, component, &self.components);
        if created {
            self.announce_archetype(target_id);
        }

        let row = self.move_entity(entity, source_id, target_id)?;
        let target = self.archetypes.archetype_mut(target_id);
        for (field, &value) in values.iter().enumerate() {
            if let Some(column) = target.get_column_mut(component, field) {
                column.set(row, value);
            }
        }
        self.components.set(component, slot, values)?;
        Ok(())
    }

    /// Adds several components in one move.
    ///
    /// The target signature is computed once, resolved through a single
    /// interning call, and the entity moves once: shared columns are copied
    /// a single time and every listed component's fields are written at the
    /// destination row, whether the component was new or already present.
    pub fn add_components(
        &mut self,
        entity: Entity,
        list: &[(ComponentId, &[f64])],
    ) -> EcsResult<()> {
        self.check_alive(entity)?;
        for (component, values) in list {
            self.check_arity(*component, values)?;
        }

        let slot = entity.slot();
        let source_id = self.entity_archetype[slot as usize];

        let mut signature: Vec<ComponentId> =
            self.archetypes.archetype(source_id).signature().to_vec();
        for (component, _) in list {
            if let Err(position) = signature.binary_search(component) {
                signature.insert(position, *component);
            }
        }

        let (target_id, created) = self.archetypes.get_or_create(signature, &self.components);
        if created {
            self.announce_archetype(target_id);
        }

        let row = if target_id == source_id {
            self.row_of(source_id, slot)?
        } else {
            self.move_entity(entity, source_id, target_id)?
        };

        let target = self.archetypes.archetype_mut(target_id);
        for (component, values) in list {
            for (field, &value) in values.iter().enumerate() {
                if let Some(column) = target.get_column_mut(*component, field) {
                    column.set(row, value);
                }
            }
        }
        for (component, values) in list {
            self.components.set(*component, slot, values)?;
        }
        Ok(())
    }

    /// Removes a component from an entity; a no-op when it is absent.
    pub fn remove_component(&mut self, entity: Entity, component: ComponentId) -> EcsResult<()> {
        self.check_alive(entity)?;
        self.components.check(component)?;

        let slot = entity.slot();
        let source_id = self.entity_archetype[slot as usize];
        if !self.archetypes.archetype(source_id).has_component(component) {
            return Ok(());
        }

        let (target_id, created) =
            self.archetypes.resolve_remove(source_id, component, &self.components);
        if created {
            self.announce_archetype(target_id);
        }
        self.move_entity(entity, source_id, target_id)?;
        Ok(())
    }

    /// Removes several components in one move. Components the entity lacks
    /// are ignored.
    pub fn remove_components(
        &mut self,
        entity: Entity,
        list: &[ComponentId],
    ) -> EcsResult<()> {
        self.check_alive(entity)?;
        for component in list {
            self.components.check(*component)?;
        }

        let slot = entity.slot();
        let source_id = self.entity_archetype[slot as usize];
        let signature: Vec<ComponentId> = self
            .archetypes
            .archetype(source_id)
            .signature()
            .iter()
            .copied()
            .filter(|c| !list.contains(c))
            .collect();

        if signature.len() == self.archetypes.archetype(source_id).signature().len() {
            return Ok(());
        }

        let (target_id, created) = self.archetypes.get_or_create(signature, &self.components);
        if created {
            self.announce_archetype(target_id);
        }
        self.move_entity(entity, source_id, target_id)?;
        Ok(())
    }

    /// Reads one field of a component the entity currently has.
    pub fn get_field(
        &self,
        entity: Entity,
        component: ComponentId,
        field: usize,
    ) -> EcsResult<f64> {
        self.check_alive(entity)?;
        self.check_field(component, field)?;
        let slot = entity.slot();
        let archetype_id = self.entity_archetype[slot as usize];
        let archetype = self.archetypes.archetype(archetype_id);
        let row = archetype
            .row_of(slot)
            .filter(|_| archetype.has_component(component))
            .ok_or(MembershipError::NotInArchetype { slot, archetype: archetype_id })?;
        let column = archetype
            .get_column(component, field)
            .ok_or(MembershipError::NotInArchetype { slot, archetype: archetype_id })?;
        Ok(column.get(row))
    }

    /// Writes one field of a component the entity currently has, updating
    /// the slot-indexed mirror as well.
    pub fn set_field(
        &mut self,
        entity: Entity,
        component: ComponentId,
        field: usize,
        value: f64,
    ) -> EcsResult<()> {
        self.check_alive(entity)?;
        self.check_field(component, field)?;
        let slot = entity.slot();
        let archetype_id = self.entity_archetype[slot as usize];
        let archetype = self.archetypes.archetype_mut(archetype_id);
        let row = archetype
            .row_of(slot)
            .filter(|_| archetype.has_component(component))
            .ok_or(MembershipError::NotInArchetype { slot, archetype: archetype_id })?;
        if let Some(column) = archetype.get_column_mut(component, field) {
            column.set(row, value);
        }
        self.components.set_field(component, slot, field, value)?;
        Ok(())
    }

    // ── deferred structural mutation ────────────────────────────────────

    /// Queues a component add for the next flush, copying the field values
    /// into the buffer entry.
    ///
    /// The component handle and value arity are validated now; entity
    /// liveness is checked at apply time, when stale entries are skipped.
    pub fn add_component_deferred(
        &mut self,
        entity: Entity,
        component: ComponentId,
        values: &[f64],
    ) -> EcsResult<()> {
        self.check_arity(component, values)?;
        self.pending_adds.push(DeferredAdd {
            entity,
            component,
            values: values.to_vec(),
        });
        Ok(())
    }

    /// Queues a component removal for the next flush.
    pub fn remove_component_deferred(
        &mut self,
        entity: Entity,
        component: ComponentId,
    ) -> EcsResult<()> {
        self.components.check(component)?;
        self.pending_removes.push(DeferredRemove { entity, component });
        Ok(())
    }

    /// Applies all buffered structural mutations, then all buffered
    /// destroys.
    pub fn flush(&mut self) -> EcsResult<()> {
        self.flush_structural()?;
        self.flush_destroyed()
    }

    /// Applies buffered adds in insertion order, then buffered removes in
    /// insertion order. Entries whose entity is no longer alive are
    /// skipped.
    pub fn flush_structural(&mut self) -> EcsResult<()> {
        let mut adds = std::mem::take(&mut self.pending_adds);
        let mut removes = std::mem::take(&mut self.pending_removes);
        let applied = adds.len() + removes.len();

        for add in adds.drain(..) {
            if !self.allocator.is_alive(add.entity) {
                continue;
            }
            self.add_component(add.entity, add.component, &add.values)?;
        }
        for remove in removes.drain(..) {
            if !self.allocator.is_alive(remove.entity) {
                continue;
            }
            self.remove_component(remove.entity, remove.component)?;
        }

        // Hand the drained buffers back so their capacity is reused.
        self.pending_adds = adds;
        self.pending_removes = removes;
        if applied > 0 {
            trace!(applied, "structural flush");
        }
        Ok(())
    }

    /// Applies buffered destroys, skipping entities already dead.
    pub fn flush_destroyed(&mut self) -> EcsResult<()> {
        let mut destroys = std::mem::take(&mut self.pending_destroys);
        for entity in destroys.drain(..) {
            if !self.allocator.is_alive(entity) {
                continue;
            }
            self.destroy_entity(entity)?;
        }
        self.pending_destroys = destroys;
        Ok(())
    }

    // ── whole-archetype moves ───────────────────────────────────────────

    /// Moves every entity of `source` into the archetype reached by adding
    /// `component`, broadcasting `values` into the new fields.
    ///
    /// ## Behavior
    /// A no-op when the source already contains the component or holds no
    /// entities. Otherwise the destination reserves capacity once, shared
    /// columns are copied with bulk range copies, the new component's
    /// columns are filled with the broadcast values, membership maps are
    /// rebuilt for every moved entity, and the source is truncated. The
    /// emptied source stays registered.
    pub fn batch_add_component(
        &mut self,
        source: ArchetypeId,
        component: ComponentId,
        values: &[f64],
    ) -> EcsResult<()> {
        self.check_arity(component, values)?;
        if self.archetypes.archetype(source).has_component(component) {
            return Ok(());
        }

        let (target, created) =
            self.archetypes.resolve_add(source, component, &self.components);
        if created {
            self.announce_archetype(target);
        }
        if self.archetypes.archetype(source).is_empty() {
            return Ok(());
        }

        let (from, to) = self.archetypes.archetype_pair_mut(source, target);
        let moved = from.len();
        let base = to.len();
        to.reserve(moved);
        for row in 0..moved {
            let entity = from.entity_at(row);
            to.add_entity(entity, entity.slot());
        }
        for &shared in from.signature() {
            let fields = from.field_count(shared).unwrap_or(0);
            for field in 0..fields {
                if let (Some(src), Some(dst)) =
                    (from.get_column(shared, field), to.get_column_mut(shared, field))
                {
                    dst.copy_range_from(base, src, 0, moved);
                }
            }
        }
        let new_fields = to.field_count(component).unwrap_or(0);
        for field in 0..new_fields {
            if let Some(column) = to.get_column_mut(component, field) {
                column.fill_range(base, moved, values[field]);
            }
        }
        for row in 0..moved {
            let slot = from.entity_at(row).slot();
            self.entity_archetype[slot as usize] = target;
            self.components.set(component, slot, values)?;
        }
        from.truncate_all();
        trace!(source, target, moved, "batch component add");
        Ok(())
    }

    /// Moves every entity of `source` into the archetype reached by
    /// removing `component`. A no-op when the source lacks the component.
    pub fn batch_remove_component(
        &mut self,
        source: ArchetypeId,
        component: ComponentId,
    ) -> EcsResult<()> {
        self.components.check(component)?;
        if !self.archetypes.archetype(source).has_component(component) {
            return Ok(());
        }

        let (target, created) =
            self.archetypes.resolve_remove(source, component, &self.components);
        if created {
            self.announce_archetype(target);
        }
        if self.archetypes.archetype(source).is_empty() {
            return Ok(());
        }

        let (from, to) = self.archetypes.archetype_pair_mut(source, target);
        let moved = from.len();
        let base = to.len();
        to.reserve(moved);
        for row in 0..moved {
            let entity = from.entity_at(row);
            to.add_entity(entity, entity.slot());
        }
        for &shared in from.signature() {
            if shared == component {
                continue;
            }
            let fields = from.field_count(shared).unwrap_or(0);
            for field in 0..fields {
                if let (Some(src), Some(dst)) =
                    (from.get_column(shared, field), to.get_column_mut(shared, field))
                {
                    dst.copy_range_from(base, src, 0, moved);
                }
            }
        }
        for row in 0..moved {
            let slot = from.entity_at(row).slot();
            self.entity_archetype[slot as usize] = target;
        }
        from.truncate_all();
        trace!(source, target, moved, "batch component remove");
        Ok(())
    }

    // ── queries ─────────────────────────────────────────────────────────

    /// Interns the query including `components`, with no exclusions.
    pub fn query(&mut self, components: &[ComponentId]) -> EcsResult<Query> {
        for component in components {
            self.components.check(*component)?;
        }
        let include = Bitset::from_ids(components);
        Ok(self.queries.get_or_insert(include, None, None, &self.archetypes))
    }

    /// Derives a query whose `include` set is widened by `components`.
    ///
    /// Widening by components already included returns the identical query.
    pub fn query_and(&mut self, query: Query, components: &[ComponentId]) -> EcsResult<Query> {
        for component in components {
            self.components.check(*component)?;
        }
        let (include, exclude, any_of) = self.queries.triple(query);
        let mut include = include.clone();
        let exclude = exclude.cloned();
        let any_of = any_of.cloned();
        for &component in components {
            include.set(component);
        }
        Ok(self.queries.get_or_insert(include, exclude, any_of, &self.archetypes))
    }

    /// Derives a query whose `exclude` set is widened by `components`.
    pub fn query_not(&mut self, query: Query, components: &[ComponentId]) -> EcsResult<Query> {
        for component in components {
            self.components.check(*component)?;
        }
        let (include, exclude, any_of) = self.queries.triple(query);
        let include = include.clone();
        let mut exclude = exclude.cloned().unwrap_or_default();
        let any_of = any_of.cloned();
        for &component in components {
            exclude.set(component);
        }
        Ok(self.queries.get_or_insert(include, Some(exclude), any_of, &self.archetypes))
    }

    /// Derives a query whose `any_of` set is widened by `components`.
    pub fn query_or(&mut self, query: Query, components: &[ComponentId]) -> EcsResult<Query> {
        for component in components {
            self.components.check(*component)?;
        }
        let (include, exclude, any_of) = self.queries.triple(query);
        let include = include.clone();
        let exclude = exclude.cloned();
        let mut any_of = any_of.cloned().unwrap_or_default();
        for &component in components {
            any_of.set(component);
        }
        Ok(self.queries.get_or_insert(include, exclude, Some(any_of), &self.archetypes))
    }

    /// The query's matched archetypes in creation order, empties included.
    pub fn matched(&self, query: Query) -> &[ArchetypeId] {
        self.queries.results(query)
    }

    /// Invokes `f` once per non-empty matched archetype.
    ///
    /// The matched list is snapshotted into the query's reusable scratch
    /// buffer, so repeated passes allocate nothing. Archetypes created by
    /// `f` itself (through deferred flushes it triggers) are picked up on
    /// the next pass, not the current one.
    pub fn each<F>(&mut self, query: Query, mut f: F) -> EcsResult<()>
    where
        F: FnMut(&mut Archetype) -> EcsResult<()>,
    {
        let scratch = self.queries.take_scratch(query);
        let mut outcome = Ok(());
        for &id in &scratch {
            let archetype = self.archetypes.archetype_mut(id);
            if archetype.is_empty() {
                continue;
            }
            outcome = f(archetype);
            if outcome.is_err() {
                break;
            }
        }
        self.queries.restore_scratch(query, scratch);
        outcome
    }

    /// Borrows an archetype by ID.
    pub fn archetype(&self, id: ArchetypeId) -> &Archetype {
        self.archetypes.archetype(id)
    }

    /// The archetype currently holding a live entity.
    pub fn archetype_of(&self, entity: Entity) -> EcsResult<ArchetypeId> {
        self.check_alive(entity)?;
        Ok(self.entity_archetype[entity.slot() as usize])
    }

    // ── internals ───────────────────────────────────────────────────────

    #[inline]
    fn check_alive(&self, entity: Entity) -> Result<(), AccessError> {
        if self.allocator.is_alive(entity) {
            Ok(())
        } else {
            Err(AccessError::DeadEntity { entity })
        }
    }

    fn check_arity(&self, component: ComponentId, values: &[f64]) -> Result<(), AccessError> {
        let expected = self.components.schema(component)?.field_count();
        if values.len() != expected {
            return Err(AccessError::FieldCountMismatch {
                component,
                expected,
                got: values.len(),
            });
        }
        Ok(())
    }

    fn check_field(&self, component: ComponentId, field: usize) -> Result<(), AccessError> {
        let schema = self.components.schema(component)?;
        if field >= schema.field_count() {
            return Err(AccessError::UnknownField {
                component,
                field,
                field_count: schema.field_count(),
            });
        }
        Ok(())
    }

    fn row_of(&self, archetype: ArchetypeId, slot: SlotIndex) -> EcsResult<Row> {
        self.archetypes
            .archetype(archetype)
            .row_of(slot)
            .ok_or_else(|| MembershipError::NotInArchetype { slot, archetype }.into())
    }

    fn announce_archetype(&mut self, id: ArchetypeId) {
        let mask = self.archetypes.archetype(id).mask().clone();
        self.queries.on_archetype_created(id, &mask);
    }

    /// Moves one entity between archetypes, copying shared columns.
    ///
    /// Appends the destination row, walks the two sorted signatures in
    /// lockstep to copy every shared field value, swap-and-pops the source
    /// row, and repoints the slot map. Returns the destination row.
    fn move_entity(
        &mut self,
        entity: Entity,
        source: ArchetypeId,
        target: ArchetypeId,
    ) -> EcsResult<Row> {
        let slot = entity.slot();
        let (from, to) = self.archetypes.archetype_pair_mut(source, target);

        let row_old = from
            .row_of(slot)
            .ok_or(MembershipError::NotInArchetype { slot, archetype: source })?;
        let row_new = to.add_entity(entity, slot);

        // Shared components fall out of the sorted-signature merge walk.
        let (mut i, mut j) = (0, 0);
        let (sig_from, sig_to) = (from.signature().to_vec(), to.signature().to_vec());
        while i < sig_from.len() && j < sig_to.len() {
            match sig_from[i].cmp(&sig_to[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    let component = sig_from[i];
                    let fields = from.field_count(component).unwrap_or(0);
                    for field in 0..fields {
                        if let (Some(src), Some(dst)) = (
                            from.get_column(component, field),
                            to.get_column_mut(component, field),
                        ) {
                            dst.copy_row_from(row_new, src, row_old);
                        }
                    }
                    i += 1;
                    j += 1;
                }
            }
        }

        from.remove_entity(slot)?;
        self.entity_archetype[slot as usize] = target;
        Ok(row_new)
    }

    fn write_fields(
        &mut self,
        archetype: ArchetypeId,
        slot: SlotIndex,
        component: ComponentId,
        values: &[f64],
    ) -> EcsResult<()> {
        let row = self.row_of(archetype, slot)?;
        let archetype = self.archetypes.archetype_mut(archetype);
        for (field, &value) in values.iter().enumerate() {
            if let Some(column) = archetype.get_column_mut(component, field) {
                column.set(row, value);
            }
        }
        Ok(())
    }
}

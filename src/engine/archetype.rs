//! Archetype storage: one bucket per exact component set.
//!
//! An `Archetype` stores every entity whose component set matches its
//! signature, in dense row-aligned typed columns, one column per field of
//! each component in the signature.
//!
//! ## Layout
//!
//! * `signature` is an immutable, strictly ascending list of component IDs.
//! * `entity_ids` is the dense row-to-entity map; rows `0..count` are valid.
//! * `index_to_row` is the sparse entity-slot-to-row map with `-1` marking
//!   absence, so membership checks and row lookups are O(1).
//! * Every field column has physical length `>= count` and is semantically
//!   valid on exactly the same row range as every other column.
//!
//! ## Mutation discipline
//!
//! Rows are removed with swap-and-pop: the last row is copied over the
//! vacated one across `entity_ids` **and every field column of every
//! component** before the count is decremented, so no partial row state is
//! ever observable. Dense growth reallocates all columns together, which
//! invalidates any borrowed column slice; callers must not hold column
//! references across structural mutations.
//!
//! ## Transition edges
//!
//! Each archetype caches, per component, the archetype reached by adding or
//! removing that component. Edges are populated lazily by the archetype
//! registry and kept bidirectional: if following `add` on component `c`
//! leads to `B`, then `B`'s `remove` edge for `c` leads back here.

use std::collections::HashMap;

use crate::engine::bitset::Bitset;
use crate::engine::component::ComponentRegistry;
use crate::engine::error::MembershipError;
use crate::engine::storage::Column;
use crate::engine::types::{
    ArchetypeId, ComponentId, Entity, Row, SlotIndex, INITIAL_DENSE_CAP,
    INITIAL_SPARSE_CAP, NO_ROW,
};

/// Cached transition targets for one component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArchetypeEdge {
    /// Archetype reached by adding the component, once resolved.
    pub add: Option<ArchetypeId>,
    /// Archetype reached by removing the component, once resolved.
    pub remove: Option<ArchetypeId>,
}

struct ComponentColumns {
    fields: Vec<Column>,
}

/// Stores entities sharing an identical component signature.
///
/// ## Invariants
/// - For every member entity `e` at row `r`: `entity_ids[r] == e` and
///   `index_to_row[e.slot()] == r`.
/// - All field columns have identical valid length equal to `len()`.
/// - The signature is strictly ascending and never changes after
///   construction.
pub struct Archetype {
    id: ArchetypeId,
    signature: Vec<ComponentId>,
    mask: Bitset,
    entity_ids: Vec<Entity>,
    index_to_row: Vec<i32>,
    columns: Vec<ComponentColumns>,
    edges: HashMap<ComponentId, ArchetypeEdge>,
    count: usize,
}

impl Archetype {
    /// Creates an empty archetype for a pre-sorted signature.
    ///
    /// ## Behavior
    /// Allocates one typed column per field of every component in the
    /// signature (tags contribute none), the dense `entity_ids` buffer, and
    /// the sparse `index_to_row` map filled with the absence sentinel.
    ///
    /// ## Invariants
    /// `signature` must be strictly ascending; the registry guarantees this
    /// for every signature it interns.
    pub fn new(id: ArchetypeId, signature: Vec<ComponentId>, registry: &ComponentRegistry) -> Self {
        debug_assert!(signature.windows(2).all(|w| w[0] < w[1]));

        let mask = Bitset::from_ids(&signature);
        let columns = signature
            .iter()
            .map(|&component| ComponentColumns {
                fields: registry
                    .schema(component)
                    .map(|s| {
                        s.fields()
                            .iter()
                            .map(|f| Column::new(f.ty, INITIAL_DENSE_CAP))
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            id,
            signature,
            mask,
            entity_ids: vec![Entity(0); INITIAL_DENSE_CAP],
            index_to_row: vec![NO_ROW; INITIAL_SPARSE_CAP],
            columns,
            edges: HashMap::new(),
            count: 0,
        }
    }

    /// Identifier of this archetype, stable for the world's lifetime.
    #[inline]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// Number of live rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the archetype currently holds no entities.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The sorted component signature.
    #[inline]
    pub fn signature(&self) -> &[ComponentId] {
        &self.signature
    }

    /// The signature as a bitset, shared with the matcher.
    #[inline]
    pub fn mask(&self) -> &Bitset {
        &self.mask
    }

    /// Entity stored at `row`. Rows `0..len()` are valid.
    #[inline]
    pub fn entity_at(&self, row: Row) -> Entity {
        debug_assert!(row < self.count);
        self.entity_ids[row]
    }

    /// The dense entity list, valid rows only.
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entity_ids[..self.count]
    }

    /// Returns `true` if the signature contains `component`.
    ///
    /// Binary search over the sorted signature.
    #[inline]
    pub fn has_component(&self, component: ComponentId) -> bool {
        self.signature.binary_search(&component).is_ok()
    }

    /// Position of `component` within the signature, if present.
    #[inline]
    pub fn component_position(&self, component: ComponentId) -> Option<usize> {
        self.signature.binary_search(&component).ok()
    }

    /// Returns `true` if every ID in `required` appears in the signature.
    pub fn matches(&self, required: &[ComponentId]) -> bool {
        required.iter().all(|c| self.has_component(*c))
    }

    /// Current row of the entity occupying `slot`, if it is a member.
    #[inline]
    pub fn row_of(&self, slot: SlotIndex) -> Option<Row> {
        match self.index_to_row.get(slot as usize) {
            Some(&row) if row != NO_ROW => Some(row as Row),
            _ => None,
        }
    }

    /// Appends an entity and returns its new row.
    ///
    /// ## Behavior
    /// - Doubles all dense storage together when the row capacity is
    ///   reached, so columns never disagree on capacity.
    /// - Doubles the sparse map (filling with the absence sentinel) when
    ///   `slot` is out of range.
    /// - Records the membership in both directions and increments the
    ///   count. Column values for the new row are written by the caller.
    pub fn add_entity(&mut self, entity: Entity, slot: SlotIndex) -> Row {
        if self.count == self.entity_ids.len() {
            self.grow_dense(self.count + 1);
        }
        if slot as usize >= self.index_to_row.len() {
            let target = (slot as usize + 1).max(self.index_to_row.len() * 2);
            self.index_to_row.resize(target, NO_ROW);
        }

        let row = self.count;
        self.entity_ids[row] = entity;
        self.index_to_row[slot as usize] = row as i32;
        self.count += 1;
        row
    }

    /// Removes the entity occupying `slot` with swap-and-pop.
    ///
    /// ## Behavior
    /// Clears the slot's sparse entry, then, unless the entity held the last
    /// row, copies the last row over the vacated one across `entity_ids`
    /// and every field column of every component, and repoints the moved
    /// entity's sparse entry. The copy is completed across all columns
    /// before the count drops, so no partial row is ever exposed.
    ///
    /// ## Returns
    /// The slot of the entity that was moved into the vacated row, or
    /// `None` when the removed entity held the last row.
    ///
    /// ## Errors
    /// `NotInArchetype` when `slot` has no row here. This indicates an
    /// engine bookkeeping bug rather than a user-facing condition.
    pub fn remove_entity(&mut self, slot: SlotIndex) -> Result<Option<SlotIndex>, MembershipError> {
        let row = self
            .row_of(slot)
            .ok_or(MembershipError::NotInArchetype { slot, archetype: self.id })?;
        let last = self.count - 1;
        self.index_to_row[slot as usize] = NO_ROW;

        let swapped = if row != last {
            self.entity_ids[row] = self.entity_ids[last];
            for group in &mut self.columns {
                for column in &mut group.fields {
                    column.copy_row_within(last, row);
                }
            }
            let moved_slot = self.entity_ids[row].slot();
            self.index_to_row[moved_slot as usize] = row as i32;
            Some(moved_slot)
        } else {
            None
        };

        self.count -= 1;
        Ok(swapped)
    }

    /// Ensures room for `additional` more rows without reallocation.
    pub fn reserve(&mut self, additional: usize) {
        let needed = self.count + additional;
        if needed > self.entity_ids.len() {
            self.grow_dense(needed);
        }
    }

    /// Drops all rows and clears every member's sparse entry.
    ///
    /// Used after a whole-archetype move once every row has been copied to
    /// its destination.
    pub fn truncate_all(&mut self) {
        for row in 0..self.count {
            let slot = self.entity_ids[row].slot();
            self.index_to_row[slot as usize] = NO_ROW;
        }
        self.count = 0;
    }

    /// Borrows the column backing `field` of `component`.
    ///
    /// The reference is invalidated by any subsequent growth of this
    /// archetype; do not hold it across structural mutations.
    pub fn get_column(&self, component: ComponentId, field: usize) -> Option<&Column> {
        let position = self.component_position(component)?;
        self.columns[position].fields.get(field)
    }

    /// Mutable variant of [`Archetype::get_column`].
    pub fn get_column_mut(&mut self, component: ComponentId, field: usize) -> Option<&mut Column> {
        let position = self.component_position(component)?;
        self.columns[position].fields.get_mut(field)
    }

    /// Borrows two distinct columns mutably at once.
    ///
    /// Supports the common iteration shape of writing one component's field
    /// while reading another's. Returns `None` if either address does not
    /// resolve or both name the same column.
    pub fn column_pair_mut(
        &mut self,
        a: (ComponentId, usize),
        b: (ComponentId, usize),
    ) -> Option<(&mut Column, &mut Column)> {
        let position_a = self.component_position(a.0)?;
        let position_b = self.component_position(b.0)?;

        if position_a == position_b {
            if a.1 == b.1 {
                return None;
            }
            let group = &mut self.columns[position_a];
            if a.1 >= group.fields.len() || b.1 >= group.fields.len() {
                return None;
            }
            let (low, high) = (a.1.min(b.1), a.1.max(b.1));
            let (head, tail) = group.fields.split_at_mut(high);
            let (first, second) = (&mut head[low], &mut tail[0]);
            return if a.1 < b.1 { Some((first, second)) } else { Some((second, first)) };
        }

        let (low, high) = (position_a.min(position_b), position_a.max(position_b));
        let (head, tail) = self.columns.split_at_mut(high);
        let low_group = &mut head[low];
        let high_group = &mut tail[0];
        let (low_field, high_field) =
            if position_a < position_b { (a.1, b.1) } else { (b.1, a.1) };
        let first = low_group.fields.get_mut(low_field)?;
        let second = high_group.fields.get_mut(high_field)?;
        if position_a < position_b {
            Some((first, second))
        } else {
            Some((second, first))
        }
    }

    /// Number of field columns stored for `component`.
    pub fn field_count(&self, component: ComponentId) -> Option<usize> {
        let position = self.component_position(component)?;
        Some(self.columns[position].fields.len())
    }

    /// Cached transition edge for `component`, if any has been resolved.
    #[inline]
    pub fn get_edge(&self, component: ComponentId) -> Option<ArchetypeEdge> {
        self.edges.get(&component).copied()
    }

    /// Records the add-transition target for `component`.
    pub fn set_edge_add(&mut self, component: ComponentId, target: ArchetypeId) {
        self.edges.entry(component).or_default().add = Some(target);
    }

    /// Records the remove-transition target for `component`.
    pub fn set_edge_remove(&mut self, component: ComponentId, target: ArchetypeId) {
        self.edges.entry(component).or_default().remove = Some(target);
    }

    fn grow_dense(&mut self, needed: usize) {
        let target = needed.max(self.entity_ids.len() * 2).max(INITIAL_DENSE_CAP);
        self.entity_ids.resize(target, Entity(0));
        for group in &mut self.columns {
            for column in &mut group.fields {
                column.grow_to(target);
            }
        }
    }
}

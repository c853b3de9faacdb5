//! Core identifiers, bit layouts, and capacity constants.
//!
//! This module defines the **fundamental types and bit-level layouts** shared
//! by every subsystem of the engine: entity handles, component and archetype
//! identifiers, and the capacity constants that size dense and sparse
//! storage.
//!
//! ## Entity representation
//!
//! Entities are encoded as a packed 32-bit integer:
//!
//! ```text
//! | generation (12 bits) | slot (20 bits) |
//! ```
//!
//! - **Slot** indexes the allocator's generation table and the per-slot
//!   sparse maps kept by archetypes and the store.
//! - **Generation** is bumped when a slot is recycled, so stale handles to a
//!   destroyed entity can be detected cheaply.
//!
//! Equality and hashing operate on the full packed integer: two handles with
//! the same slot but different generations are distinct values.
//!
//! ## Capacities
//!
//! The bit widths bound the world at 2^20 concurrent entities and 2^12
//! generations per slot. Both are validated with static assertions so a
//! layout change cannot silently corrupt packing arithmetic. The remaining
//! constants seed initial allocations for dense columns and sparse maps and
//! only affect growth behavior, never correctness.

/// Bit-width type used for compile-time layout calculations.
pub type Bits = u32;

/// Packed 32-bit entity handle value.
pub type EntityBits = u32;
/// Index of an entity slot within the allocator.
pub type SlotIndex = u32;
/// Generation counter detecting stale entity handles.
pub type Generation = u16;

/// Dense identifier for a registered component schema.
pub type ComponentId = u16;
/// Dense identifier for an archetype.
pub type ArchetypeId = u32;
/// Dense row index within an archetype.
pub type Row = usize;

/// Number of bits reserved for the entity slot index.
pub const SLOT_BITS: Bits = 20;
/// Number of bits reserved for the entity generation.
pub const GENERATION_BITS: Bits = 12;

const _: [(); 1] = [(); (SLOT_BITS + GENERATION_BITS == 32) as usize];
const _: [(); 1] = [(); (SLOT_BITS > 0 && GENERATION_BITS > 0) as usize];

/// Mask selecting the slot portion of a packed entity.
pub const SLOT_MASK: EntityBits = (1 << SLOT_BITS) - 1;
/// Mask selecting the generation portion after shifting.
pub const GENERATION_MASK: EntityBits = (1 << GENERATION_BITS) - 1;
/// Maximum number of concurrently live entity slots.
pub const SLOT_CAP: usize = 1 << SLOT_BITS;
/// Generation values wrap modulo this constant.
pub const GENERATION_CAP: Generation = 1 << GENERATION_BITS;

/// Initial number of rows allocated for an archetype's dense columns.
pub const INITIAL_DENSE_CAP: usize = 16;
/// Initial length of an archetype's sparse `slot -> row` map.
pub const INITIAL_SPARSE_CAP: usize = 64;
/// Initial length of the registry's flat per-slot columns.
pub const INITIAL_COLUMN_CAP: usize = 64;

/// Sentinel marking an absent entry in sparse `slot -> row` maps.
pub const NO_ROW: i32 = -1;

/// Opaque, generational handle for an entity.
///
/// ## Purpose
/// `Entity` is a compact value that uniquely identifies an entity instance
/// at a point in time. It encodes enough information to:
///
/// - index directly into slot-addressed storage,
/// - detect stale handles after a slot has been recycled.
///
/// ## Invariants
/// - Two handles with the same slot but different generations are distinct.
/// - A handle is alive iff the allocator's stored generation for its slot
///   matches the handle's generation.
///
/// ## Notes
/// `Entity` values are cheap to copy and compare and carry no lifetime.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Entity(pub EntityBits);

#[inline]
const fn pack(slot: SlotIndex, generation: Generation) -> EntityBits {
    ((generation as EntityBits) << SLOT_BITS) | (slot & SLOT_MASK)
}

impl Entity {
    /// Packs a slot index and generation into a handle.
    #[inline]
    pub fn new(slot: SlotIndex, generation: Generation) -> Self {
        debug_assert!((slot as usize) < SLOT_CAP);
        debug_assert!(generation < GENERATION_CAP);
        Entity(pack(slot, generation))
    }

    /// Returns the slot index encoded in this handle.
    #[inline]
    pub const fn slot(self) -> SlotIndex {
        self.0 & SLOT_MASK
    }

    /// Returns the generation encoded in this handle.
    #[inline]
    pub const fn generation(self) -> Generation {
        ((self.0 >> SLOT_BITS) & GENERATION_MASK) as Generation
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.slot(), self.generation())
    }
}

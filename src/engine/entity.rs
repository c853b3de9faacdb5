//! Generational entity allocation.
//!
//! This module owns entity identity and liveness. Entities are handed out as
//! packed `(slot, generation)` handles; destroying an entity bumps its
//! slot's generation and recycles the slot through a LIFO free list, so any
//! handle issued before the destroy fails the liveness check from then on.
//!
//! ## Invariants
//! - A handle is alive iff `generations[slot] == handle.generation`.
//! - Free slots always refer to dead entities whose generation was already
//!   bumped at destroy time; `create` reads the stored generation as-is.
//! - `live` equals the number of slots currently alive.
//!
//! ## Recycling
//! The free list is last-in-first-out: the slot most recently destroyed is
//! the first one reissued. Generations wrap modulo 2^12, so a slot can be
//! recycled 4096 times before an ancient handle could collide again.

use tracing::trace;

use crate::engine::error::AllocError;
use crate::engine::types::{
    Entity, Generation, SlotIndex, GENERATION_CAP, SLOT_CAP,
};

/// Hands out packed generational entity handles and recycles slots.
///
/// ## Design
/// - `generations` is a dense table indexed by slot, grown by doubling.
/// - `next_slot` is the high-water mark; slots below it have been issued at
///   least once.
/// - `free` is a LIFO stack of recyclable slots.
#[derive(Default)]
pub struct EntityAllocator {
    generations: Vec<Generation>,
    next_slot: usize,
    free: Vec<SlotIndex>,
    live: usize,
}

impl EntityAllocator {
    /// Creates an empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new entity handle.
    ///
    /// ## Behavior
    /// - Pops a recycled slot if one is free and reads its stored (already
    ///   bumped) generation.
    /// - Otherwise takes the next fresh slot with generation 0, doubling the
    ///   generation table when it is full.
    ///
    /// ## Errors
    /// - `CapacityOverflow` once the slot space (2^20) is exhausted.
    /// - `GenerationOverflow` if a recycled slot's stored generation does
    ///   not fit the 12-bit field. Recycling wraps, so this guards an
    ///   invariant rather than a reachable state.
    pub fn create(&mut self) -> Result<Entity, AllocError> {
        if let Some(slot) = self.free.pop() {
            let generation = self.generations[slot as usize];
            if generation >= GENERATION_CAP {
                return Err(AllocError::GenerationOverflow { slot });
            }
            self.live += 1;
            return Ok(Entity::new(slot, generation));
        }

        if self.next_slot >= SLOT_CAP {
            return Err(AllocError::CapacityOverflow { capacity: SLOT_CAP });
        }

        let slot = self.next_slot;
        if slot >= self.generations.len() {
            let grown = (self.generations.len() * 2).clamp(64, SLOT_CAP);
            self.generations.resize(grown, 0);
        }
        self.generations[slot] = 0;
        self.next_slot += 1;
        self.live += 1;
        Ok(Entity::new(slot as SlotIndex, 0))
    }

    /// Destroys an entity and invalidates its handle.
    ///
    /// ## Behavior
    /// Bumps the slot's generation modulo 2^12, pushes the slot onto the
    /// free list, and decrements the live count. Every handle previously
    /// issued for this slot is stale afterwards.
    ///
    /// ## Errors
    /// `DoubleDestroy` if the handle is not alive.
    pub fn destroy(&mut self, entity: Entity) -> Result<(), AllocError> {
        if !self.is_alive(entity) {
            return Err(AllocError::DoubleDestroy { entity });
        }
        let slot = entity.slot();
        self.generations[slot as usize] =
            (self.generations[slot as usize] + 1) % GENERATION_CAP;
        self.free.push(slot);
        self.live -= 1;
        trace!(slot, "entity slot recycled");
        Ok(())
    }

    /// Returns `true` if the handle refers to a live entity.
    ///
    /// A destroyed slot's stored generation is already bumped, so comparing
    /// generations alone distinguishes live handles from stale ones.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.slot() as usize;
        slot < self.next_slot && self.generations[slot] == entity.generation()
    }

    /// Number of live entities.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// High-water slot count; every slot below this has been issued.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.next_slot
    }
}

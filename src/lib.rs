//! # archon-ecs
//!
//! Archetype-based Entity-Component-System core for large simulated
//! populations.
//!
//! ## Design Goals
//! - Archetype storage with dense, row-aligned typed columns
//! - Live, reference-stable query results
//! - Deferred structural mutation with a deterministic flush order
//! - Deterministic phased scheduling
//!
//! Entities are packed generational handles; components are runtime
//! schemas over a closed set of numeric field types; systems run in six
//! fixed phases with topologically sorted ordering inside each.
//!
//! ```
//! use archon_ecs::{system, FieldType, Phase, Schema, Scheduler, Store};
//!
//! let mut store = Store::new();
//! let health = store.register_component(
//!     Schema::new("Health").field("points", FieldType::I32),
//! );
//!
//! let entity = store.create_entity().unwrap();
//! store.add_component(entity, health, &[100.0]).unwrap();
//!
//! let mut scheduler = Scheduler::new();
//! scheduler
//!     .add_system(
//!         Phase::Update,
//!         system("decay", move |ctx, _dt| {
//!             let query = ctx.query(&[health])?;
//!             ctx.each(query, |archetype| {
//!                 let rows = archetype.len();
//!                 if let Some(points) =
//!                     archetype.get_column_mut(health, 0).and_then(|c| c.as_i32_mut())
//!                 {
//!                     for value in &mut points[..rows] {
//!                         *value -= 1;
//!                     }
//!                 }
//!                 Ok(())
//!             })
//!         }),
//!     )
//!     .unwrap();
//!
//! scheduler.run_startup(&mut store).unwrap();
//! scheduler.run_update(&mut store, 0.016).unwrap();
//! assert_eq!(store.get_field(entity, health, 0).unwrap(), 99.0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::archetype::{Archetype, ArchetypeEdge};
pub use engine::bitset::Bitset;
pub use engine::component::{ComponentRegistry, Field, Schema};
pub use engine::context::SystemContext;
pub use engine::entity::EntityAllocator;
pub use engine::error::{
    AccessError, AllocError, EcsError, EcsResult, MembershipError, ScheduleError,
};
pub use engine::query::Query;
pub use engine::scheduler::{Phase, Scheduler, STARTUP_PHASES, UPDATE_PHASES};
pub use engine::storage::{Column, FieldType};
pub use engine::store::Store;
pub use engine::systems::{system, SystemDescriptor, SystemFn};
pub use engine::types::{ArchetypeId, ComponentId, Entity, Row, SlotIndex};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used types.
///
/// Import with:
/// ```rust
/// use archon_ecs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        system, EcsError, EcsResult, Entity, FieldType, Phase, Query, Schema, Scheduler, Store,
        SystemContext, SystemDescriptor,
    };
}

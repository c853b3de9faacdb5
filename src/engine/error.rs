//! Error types for the entity store and scheduler.
//!
//! This module declares focused, composable error types for the storage and
//! scheduling pipeline. Each error models a single failure mode and carries
//! enough structured context to make the failure actionable from a log line
//! without reproducing it.
//!
//! ## Goals
//! * **Specificity:** one type per failure family (allocation, component
//!   access, archetype membership, scheduling).
//! * **Ergonomics:** every error implements [`std::error::Error`] and
//!   [`std::fmt::Display`], with `From<T>` conversions into the aggregate
//!   [`EcsError`] so `?` composes across layers.
//! * **Policy:** these are programmer errors, not recoverable runtime
//!   conditions. They surface at the faulting operation; no rollback is
//!   attempted. Deferred operations are more permissive by design and skip
//!   stale entities silently instead of erroring.
//!
//! ## Typical flow
//! Leaf modules return their focused type (e.g. [`AllocError`] from the
//! entity allocator). The store and scheduler bubble these into [`EcsError`]
//! via `?`, which callers can match for control flow or format for logs.

use std::fmt;

use crate::engine::types::{ArchetypeId, ComponentId, Entity, SlotIndex};

/// Convenience alias for results produced by the engine.
pub type EcsResult<T> = Result<T, EcsError>;

/// Failures raised by the generational entity allocator.
///
/// ### Variants
/// * `CapacityOverflow` — the slot space (2^20 entities) is exhausted.
///   Fatal: the world cannot hold more concurrent entities.
/// * `GenerationOverflow` — a slot's generation counter no longer fits its
///   12-bit field. Not reachable through normal recycling, which wraps;
///   fatal if it is ever observed.
/// * `DoubleDestroy` — an immediate destroy targeted a handle that is not
///   alive. Caller bug; deferred destroys skip this case silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Entity slot space is exhausted.
    CapacityOverflow {
        /// Upper bound on concurrent entity slots.
        capacity: usize,
    },
    /// A slot's stored generation exceeds the 12-bit field.
    GenerationOverflow {
        /// Offending slot index.
        slot: SlotIndex,
    },
    /// Immediate destroy of an entity that is not alive.
    DoubleDestroy {
        /// The stale handle passed in.
        entity: Entity,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::CapacityOverflow { capacity } => {
                write!(f, "entity slot space exhausted (capacity {capacity})")
            }
            AllocError::GenerationOverflow { slot } => {
                write!(f, "generation counter overflow on slot {slot}")
            }
            AllocError::DoubleDestroy { entity } => {
                write!(f, "destroy of dead or stale entity {entity}")
            }
        }
    }
}

impl std::error::Error for AllocError {}

/// Failures raised when addressing components or their fields.
///
/// ### Variants
/// * `DeadEntity` — an immediate operation referenced an entity that is not
///   alive. Caller bug; the deferred paths skip stale targets instead.
/// * `UnknownComponent` — the component handle was never registered.
/// * `UnknownField` — the field index is outside the component's schema.
/// * `FieldCountMismatch` — a value slice did not match the schema arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// Immediate operation on a dead or stale entity.
    DeadEntity {
        /// The handle that failed the liveness check.
        entity: Entity,
    },
    /// Operation referenced an unregistered component.
    UnknownComponent {
        /// Offending component handle.
        component: ComponentId,
    },
    /// Field index outside the component's schema.
    UnknownField {
        /// Component being addressed.
        component: ComponentId,
        /// Requested field index.
        field: usize,
        /// Number of fields the schema declares.
        field_count: usize,
    },
    /// Provided value slice does not match the schema's field count.
    FieldCountMismatch {
        /// Component being written.
        component: ComponentId,
        /// Field count the schema declares.
        expected: usize,
        /// Number of values provided.
        got: usize,
    },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::DeadEntity { entity } => {
                write!(f, "operation on dead or stale entity {entity}")
            }
            AccessError::UnknownComponent { component } => {
                write!(f, "unregistered component {component}")
            }
            AccessError::UnknownField { component, field, field_count } => {
                write!(
                    f,
                    "field {field} out of range for component {component} ({field_count} fields)"
                )
            }
            AccessError::FieldCountMismatch { component, expected, got } => {
                write!(
                    f,
                    "component {component} expects {expected} field values, got {got}"
                )
            }
        }
    }
}

impl std::error::Error for AccessError {}

/// Internal consistency failures in archetype membership bookkeeping.
///
/// `NotInArchetype` indicates that a swap-and-pop or row lookup addressed a
/// slot the archetype does not contain. This is an engine invariant
/// violation rather than a user-facing condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipError {
    /// The slot has no row in the addressed archetype.
    NotInArchetype {
        /// Entity slot that was looked up.
        slot: SlotIndex,
        /// Archetype that was expected to contain it.
        archetype: ArchetypeId,
    },
}

impl fmt::Display for MembershipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipError::NotInArchetype { slot, archetype } => {
                write!(f, "slot {slot} is not a member of archetype {archetype}")
            }
        }
    }
}

impl std::error::Error for MembershipError {}

/// Failures raised while registering or ordering systems.
///
/// ### Variants
/// * `DuplicateSystem` — a system name was registered twice.
/// * `SystemNotFound` — a removal or an ordering constraint referenced a
///   name that is not registered in the relevant phase.
/// * `CyclicDependency` — the `before`/`after` constraints of a phase admit
///   no topological order. Raised at sort time, before any system runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A system with this name is already registered.
    DuplicateSystem {
        /// Conflicting system name.
        name: String,
    },
    /// A referenced system is not registered.
    SystemNotFound {
        /// The name that failed to resolve.
        name: String,
    },
    /// Ordering constraints form a cycle within a phase.
    CyclicDependency {
        /// Phase whose constraints are unsatisfiable.
        phase: &'static str,
    },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::DuplicateSystem { name } => {
                write!(f, "system '{name}' is already registered")
            }
            ScheduleError::SystemNotFound { name } => {
                write!(f, "system '{name}' is not registered")
            }
            ScheduleError::CyclicDependency { phase } => {
                write!(f, "cyclic ordering constraints in phase {phase}")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Aggregate error for all engine operations.
///
/// Wraps the focused error families so public entry points can return one
/// expressive type while leaf modules keep precise signatures. `From`
/// conversions allow `?` from any layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Entity allocation or destruction failed.
    Alloc(AllocError),
    /// Component or field addressing failed.
    Access(AccessError),
    /// Archetype membership bookkeeping failed.
    Membership(MembershipError),
    /// System registration or ordering failed.
    Schedule(ScheduleError),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::Alloc(e) => write!(f, "{e}"),
            EcsError::Access(e) => write!(f, "{e}"),
            EcsError::Membership(e) => write!(f, "{e}"),
            EcsError::Schedule(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EcsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EcsError::Alloc(e) => Some(e),
            EcsError::Access(e) => Some(e),
            EcsError::Membership(e) => Some(e),
            EcsError::Schedule(e) => Some(e),
        }
    }
}

impl From<AllocError> for EcsError {
    fn from(e: AllocError) -> Self {
        EcsError::Alloc(e)
    }
}

impl From<AccessError> for EcsError {
    fn from(e: AccessError) -> Self {
        EcsError::Access(e)
    }
}

impl From<MembershipError> for EcsError {
    fn from(e: MembershipError) -> Self {
        EcsError::Membership(e)
    }
}

impl From<ScheduleError> for EcsError {
    fn from(e: ScheduleError) -> Self {
        EcsError::Schedule(e)
    }
}

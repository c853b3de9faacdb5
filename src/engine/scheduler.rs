//! Phased system scheduling and execution.
//!
//! Systems are grouped into six phases executed in a fixed order: three
//! startup phases run once, three update phases run every tick. Within a
//! phase the run order is a topological sort of the declared `before` and
//! `after` constraints, with ties broken deterministically by registration
//! order.
//!
//! ## Flush boundaries
//!
//! After every phase the store applies its deferred buffers. Structural
//! mutations queued by any system in a phase are therefore invisible to all
//! systems of that phase, later ones included, and visible to every system
//! of the next phase.
//!
//! ## Sorting
//!
//! The per-phase order is computed lazily and cached; adding or removing a
//! system invalidates only its phase's cache. Sorting builds the constraint
//! graph, seeds a min-heap with all zero-in-degree systems keyed by
//! insertion index, and repeatedly emits the minimum. Emitting fewer
//! systems than the phase holds means the constraints form a cycle, which
//! is reported at sort time, before any system body runs.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use tracing::debug;

use crate::engine::context::SystemContext;
use crate::engine::error::{EcsResult, ScheduleError};
use crate::engine::store::Store;
use crate::engine::systems::SystemDescriptor;

/// One of the six execution phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// First startup phase.
    PreStartup,
    /// Main startup phase.
    Startup,
    /// Last startup phase.
    PostStartup,
    /// First per-tick phase.
    PreUpdate,
    /// Main per-tick phase.
    Update,
    /// Last per-tick phase.
    PostUpdate,
}

/// The startup phases in execution order.
pub const STARTUP_PHASES: [Phase; 3] = [Phase::PreStartup, Phase::Startup, Phase::PostStartup];
/// The per-tick phases in execution order.
pub const UPDATE_PHASES: [Phase; 3] = [Phase::PreUpdate, Phase::Update, Phase::PostUpdate];

const PHASE_COUNT: usize = 6;

impl Phase {
    #[inline]
    fn index(self) -> usize {
        match self {
            Phase::PreStartup => 0,
            Phase::Startup => 1,
            Phase::PostStartup => 2,
            Phase::PreUpdate => 3,
            Phase::Update => 4,
            Phase::PostUpdate => 5,
        }
    }

    /// Phase name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Phase::PreStartup => "pre_startup",
            Phase::Startup => "startup",
            Phase::PostStartup => "post_startup",
            Phase::PreUpdate => "pre_update",
            Phase::Update => "update",
            Phase::PostUpdate => "post_update",
        }
    }
}

struct SystemEntry {
    descriptor: SystemDescriptor,
    insertion: u64,
}

#[derive(Default)]
struct PhaseSystems {
    systems: Vec<SystemEntry>,
    /// Cached topological order as indices into `systems`; `None` when a
    /// registration change invalidated it.
    order: Option<Vec<usize>>,
}

/// Registers systems into phases and executes them in sorted order.
pub struct Scheduler {
    phases: [PhaseSystems; PHASE_COUNT],
    next_insertion: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self {
            phases: std::array::from_fn(|_| PhaseSystems::default()),
            next_insertion: 0,
        }
    }

    /// Registers systems into a phase.
    ///
    /// ## Errors
    /// `DuplicateSystem` when a name is already registered in any phase.
    /// Ordering constraints are validated later, at sort time, so systems
    /// may reference names registered after them.
    pub fn add_systems(
        &mut self,
        phase: Phase,
        entries: impl IntoIterator<Item = SystemDescriptor>,
    ) -> EcsResult<()> {
        for descriptor in entries {
            if self.has_system(&descriptor.name) {
                return Err(ScheduleError::DuplicateSystem { name: descriptor.name }.into());
            }
            let slot = &mut self.phases[phase.index()];
            slot.systems.push(SystemEntry {
                descriptor,
                insertion: self.next_insertion,
            });
            self.next_insertion += 1;
            slot.order = None;
        }
        Ok(())
    }

    /// Registers a single system into a phase.
    pub fn add_system(&mut self, phase: Phase, entry: SystemDescriptor) -> EcsResult<()> {
        self.add_systems(phase, std::iter::once(entry))
    }

    /// Removes a system by name.
    ///
    /// ## Errors
    /// `SystemNotFound` when no phase holds the name.
    pub fn remove_system(&mut self, name: &str) -> EcsResult<()> {
        for slot in &mut self.phases {
            if let Some(index) = slot.systems.iter().position(|e| e.descriptor.name == name) {
                slot.systems.remove(index);
                slot.order = None;
                return Ok(());
            }
        }
        Err(ScheduleError::SystemNotFound { name: name.to_string() }.into())
    }

    /// Returns `true` if any phase holds a system with this name.
    pub fn has_system(&self, name: &str) -> bool {
        self.phases
            .iter()
            .any(|slot| slot.systems.iter().any(|e| e.descriptor.name == name))
    }

    /// All registered system names, in registration order.
    pub fn get_all_systems(&self) -> Vec<&str> {
        let mut entries: Vec<(&u64, &str)> = self
            .phases
            .iter()
            .flat_map(|slot| {
                slot.systems
                    .iter()
                    .map(|e| (&e.insertion, e.descriptor.name.as_str()))
            })
            .collect();
        entries.sort_by_key(|(insertion, _)| **insertion);
        entries.into_iter().map(|(_, name)| name).collect()
    }

    /// Total number of registered systems.
    pub fn len(&self) -> usize {
        self.phases.iter().map(|slot| slot.systems.len()).sum()
    }

    /// Returns `true` if no system is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every system and cached order.
    pub fn clear(&mut self) {
        for slot in &mut self.phases {
            slot.systems.clear();
            slot.order = None;
        }
    }

    /// Runs the three startup phases once, flushing after each.
    pub fn run_startup(&mut self, store: &mut Store) -> EcsResult<()> {
        for phase in STARTUP_PHASES {
            self.run_phase(phase, store, 0.0)?;
        }
        Ok(())
    }

    /// Runs the three update phases for one tick, flushing after each.
    pub fn run_update(&mut self, store: &mut Store, dt: f64) -> EcsResult<()> {
        for phase in UPDATE_PHASES {
            self.run_phase(phase, store, dt)?;
        }
        Ok(())
    }

    fn run_phase(&mut self, phase: Phase, store: &mut Store, dt: f64) -> EcsResult<()> {
        self.ensure_order(phase)?;
        let slot = &mut self.phases[phase.index()];
        let Some(order) = slot.order.take() else {
            return Ok(());
        };

        let mut outcome = Ok(());
        for &index in &order {
            let entry = &mut slot.systems[index];
            let mut context = SystemContext::new(store);
            outcome = (entry.descriptor.run)(&mut context, dt);
            if outcome.is_err() {
                break;
            }
        }
        self.phases[phase.index()].order = Some(order);
        outcome?;
        store.flush()
    }

    /// Computes and caches the phase's topological order.
    ///
    /// ## Errors
    /// - `SystemNotFound` for an ordering constraint naming a system that
    ///   is not registered in the same phase.
    /// - `CyclicDependency` when the constraints admit no total order.
    fn ensure_order(&mut self, phase: Phase) -> EcsResult<()> {
        let slot = &mut self.phases[phase.index()];
        if slot.order.is_some() {
            return Ok(());
        }

        let count = slot.systems.len();
        let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(count);
        for (index, entry) in slot.systems.iter().enumerate() {
            by_name.insert(entry.descriptor.name.as_str(), index);
        }

        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut in_degree = vec![0usize; count];
        for (index, entry) in slot.systems.iter().enumerate() {
            for name in &entry.descriptor.before {
                let target = *by_name.get(name.as_str()).ok_or_else(|| {
                    ScheduleError::SystemNotFound { name: name.clone() }
                })?;
                edges[index].push(target);
                in_degree[target] += 1;
            }
            for name in &entry.descriptor.after {
                let source = *by_name.get(name.as_str()).ok_or_else(|| {
                    ScheduleError::SystemNotFound { name: name.clone() }
                })?;
                edges[source].push(index);
                in_degree[index] += 1;
            }
        }

        // Min-heap on insertion index gives a deterministic tiebreak.
        let mut ready: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();
        for (index, &degree) in in_degree.iter().enumerate() {
            if degree == 0 {
                ready.push(Reverse((slot.systems[index].insertion, index)));
            }
        }

        let mut order = Vec::with_capacity(count);
        while let Some(Reverse((_, index))) = ready.pop() {
            order.push(index);
            for &next in &edges[index] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse((slot.systems[next].insertion, next)));
                }
            }
        }

        if order.len() != count {
            return Err(ScheduleError::CyclicDependency { phase: phase.name() }.into());
        }

        debug!(phase = phase.name(), systems = count, "schedule order rebuilt");
        slot.order = Some(order);
        Ok(())
    }
}

//! System descriptors and ordering declarations.
//!
//! A **system** is a named unit of logic run by the scheduler once per
//! phase execution. Systems receive a [`SystemContext`] and the tick's
//! delta time, and may declare ordering constraints against other systems
//! in the same phase by name.
//!
//! `SystemDescriptor` is a plain tagged record rather than a trait object
//! hierarchy: the executable body is a boxed closure and the ordering
//! constraints are data, so the scheduler can sort without dynamic
//! dispatch.

use crate::engine::context::SystemContext;
use crate::engine::error::EcsResult;

/// Executable body of a system.
pub type SystemFn = Box<dyn FnMut(&mut SystemContext<'_>, f64) -> EcsResult<()>>;

/// A named system with optional ordering constraints.
pub struct SystemDescriptor {
    /// Unique name; ordering constraints and removal address systems by it.
    pub name: String,
    /// The system body.
    pub run: SystemFn,
    /// Names of systems in the same phase that must run after this one.
    pub before: Vec<String>,
    /// Names of systems in the same phase that must run before this one.
    pub after: Vec<String>,
}

impl SystemDescriptor {
    /// Declares that this system runs before the named systems.
    pub fn before(mut self, names: &[&str]) -> Self {
        self.before.extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Declares that this system runs after the named systems.
    pub fn after(mut self, names: &[&str]) -> Self {
        self.after.extend(names.iter().map(|n| n.to_string()));
        self
    }
}

/// Builds a system descriptor from a name and a closure.
pub fn system<F>(name: impl Into<String>, f: F) -> SystemDescriptor
where
    F: FnMut(&mut SystemContext<'_>, f64) -> EcsResult<()> + 'static,
{
    SystemDescriptor {
        name: name.into(),
        run: Box::new(f),
        before: Vec::new(),
        after: Vec::new(),
    }
}

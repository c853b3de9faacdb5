//! Deferred structural mutation buffer entries.

use crate::engine::types::{ComponentId, Entity};

/// Buffered component addition. Captures the full generational handle and a
/// copy of the field values, so staleness is detectable at apply time.
pub struct DeferredAdd {
    /// Target entity as it was when the add was queued.
    pub entity: Entity,
    /// Component to add.
    pub component: ComponentId,
    /// Field values to write, one per schema field.
    pub values: Vec<f64>,
}

/// Buffered component removal.
pub struct DeferredRemove {
    /// Target entity as it was when the remove was queued.
    pub entity: Entity,
    /// Component to remove.
    pub component: ComponentId,
}

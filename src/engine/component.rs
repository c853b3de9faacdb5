//! Component schemas and the component registry.
//!
//! A component is a named, fixed-schema record identified by a dense
//! integer. The schema lists its fields in order, each tagged with one of
//! the eight supported backing types; a schema with no fields is a *tag*
//! and participates in archetype signatures without owning storage.
//!
//! ## Registry storage
//! Besides schemas, the registry owns one flat typed column per field,
//! indexed directly by entity slot. This slot-addressed mirror gives O(1)
//! random access to the last value written through the store for any live
//! entity, independent of which archetype row currently holds the entity.
//! Archetype columns remain authoritative for iteration; the mirror is
//! written through on component writes and poisoned when a slot's entity is
//! destroyed. Poisoning is hygiene, not required for correctness.
//!
//! ## Invariants
//! - `ComponentId` values are assigned sequentially in registration order.
//! - Every field of every registered component has exactly one mirror
//!   column whose backing type matches the schema.
//! - Mirror columns are grown before any write, so they are always long
//!   enough to index any slot that has been written.

use tracing::debug;

use crate::engine::error::AccessError;
use crate::engine::storage::{Column, FieldType};
use crate::engine::types::{ComponentId, SlotIndex, INITIAL_COLUMN_CAP};

/// One named, typed field of a component schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    /// Field name, used for diagnostics and name-based lookup.
    pub name: String,
    /// Backing type of the field's columns.
    pub ty: FieldType,
}

/// Ordered, named field list describing one component.
///
/// Built with the chaining constructor:
///
/// ```
/// use archon_ecs::{Schema, FieldType};
///
/// let position = Schema::new("Position")
///     .field("x", FieldType::F64)
///     .field("y", FieldType::F64);
/// assert_eq!(position.field_count(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
}

impl Schema {
    /// Starts a schema with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    /// Appends a field to the schema.
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(Field { name: name.into(), ty });
        self
    }

    /// Component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of fields.
    #[inline]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the schema declares no fields.
    #[inline]
    pub fn is_tag(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field list in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Resolves a field index by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

struct ComponentRecord {
    schema: Schema,
    /// Slot-indexed mirror, one column per field.
    columns: Vec<Column>,
}

/// Assigns component IDs and owns schemas plus slot-indexed mirror columns.
#[derive(Default)]
pub struct ComponentRegistry {
    records: Vec<ComponentRecord>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema and returns its assigned component ID.
    ///
    /// IDs are sequential in registration order. One mirror column per field
    /// is allocated at the initial capacity.
    pub fn register(&mut self, schema: Schema) -> ComponentId {
        debug_assert!(self.records.len() < ComponentId::MAX as usize);
        let id = self.records.len() as ComponentId;
        let columns = schema
            .fields
            .iter()
            .map(|f| Column::new(f.ty, INITIAL_COLUMN_CAP))
            .collect();
        debug!(id, name = schema.name.as_str(), fields = schema.field_count(), "component registered");
        self.records.push(ComponentRecord { schema, columns });
        id
    }

    /// Registers a field-less tag component.
    pub fn register_tag(&mut self, name: impl Into<String>) -> ComponentId {
        self.register(Schema::new(name))
    }

    /// Number of registered components.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Validates a component handle.
    #[inline]
    pub fn check(&self, component: ComponentId) -> Result<(), AccessError> {
        if (component as usize) < self.records.len() {
            Ok(())
        } else {
            Err(AccessError::UnknownComponent { component })
        }
    }

    /// Borrows the schema of a registered component.
    pub fn schema(&self, component: ComponentId) -> Result<&Schema, AccessError> {
        self.check(component)?;
        Ok(&self.records[component as usize].schema)
    }

    /// Returns `true` if the component is a tag.
    pub fn is_tag(&self, component: ComponentId) -> Result<bool, AccessError> {
        Ok(self.schema(component)?.is_tag())
    }

    /// Grows every mirror column to hold at least `slots` entries.
    pub fn ensure_capacity(&mut self, slots: usize) {
        for record in &mut self.records {
            for column in &mut record.columns {
                column.grow_to(slots);
            }
        }
    }

    /// Writes a full value row for `slot`, one value per schema field.
    ///
    /// ## Errors
    /// `FieldCountMismatch` when the value slice does not match the schema.
    pub fn set(
        &mut self,
        component: ComponentId,
        slot: SlotIndex,
        values: &[f64],
    ) -> Result<(), AccessError> {
        self.check(component)?;
        let record = &mut self.records[component as usize];
        if values.len() != record.schema.field_count() {
            return Err(AccessError::FieldCountMismatch {
                component,
                expected: record.schema.field_count(),
                got: values.len(),
            });
        }
        for (column, &value) in record.columns.iter_mut().zip(values) {
            column.grow_to(slot as usize + 1);
            column.set(slot as usize, value);
        }
        Ok(())
    }

    /// Writes one field of `slot`.
    pub fn set_field(
        &mut self,
        component: ComponentId,
        slot: SlotIndex,
        field: usize,
        value: f64,
    ) -> Result<(), AccessError> {
        self.check_field(component, field)?;
        let column = &mut self.records[component as usize].columns[field];
        column.grow_to(slot as usize + 1);
        column.set(slot as usize, value);
        Ok(())
    }

    /// Reads one field of `slot`, widened to `f64`.
    ///
    /// Slots never written read back as zero (the column fill value).
    pub fn get_field(
        &self,
        component: ComponentId,
        slot: SlotIndex,
        field: usize,
    ) -> Result<f64, AccessError> {
        self.check_field(component, field)?;
        let column = &self.records[component as usize].columns[field];
        if (slot as usize) < column.len() {
            Ok(column.get(slot as usize))
        } else {
            Ok(0.0)
        }
    }

    /// Borrows the whole slot-indexed column of one field.
    pub fn get_column(
        &self,
        component: ComponentId,
        field: usize,
    ) -> Result<&Column, AccessError> {
        self.check_field(component, field)?;
        Ok(&self.records[component as usize].columns[field])
    }

    /// Poisons every field of `slot`: floats become NaN, integers become
    /// all-bits-set. Applied when the slot's entity is destroyed.
    pub fn clear(&mut self, component: ComponentId, slot: SlotIndex) -> Result<(), AccessError> {
        self.check(component)?;
        for column in &mut self.records[component as usize].columns {
            if (slot as usize) < column.len() {
                column.poison(slot as usize);
            }
        }
        Ok(())
    }

    #[inline]
    fn check_field(&self, component: ComponentId, field: usize) -> Result<(), AccessError> {
        self.check(component)?;
        let field_count = self.records[component as usize].schema.field_count();
        if field >= field_count {
            return Err(AccessError::UnknownField { component, field, field_count });
        }
        Ok(())
    }
}

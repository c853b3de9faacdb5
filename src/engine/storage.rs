//! Flat typed column storage.
//!
//! A `Column` is one backing array for one field of one component, in one of
//! the eight supported numeric types. Columns are kept at physical length
//! `>= count`; the owner tracks how many leading rows are semantically
//! valid. Field values cross the API boundary as `f64`, which represents
//! every supported backing type exactly; writes convert with an `as` cast
//! into the backing type.

use std::fmt;

/// Backing type tag for one schema field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::F32 => "f32",
            FieldType::F64 => "f64",
            FieldType::I8 => "i8",
            FieldType::I16 => "i16",
            FieldType::I32 => "i32",
            FieldType::U8 => "u8",
            FieldType::U16 => "u16",
            FieldType::U32 => "u32",
        };
        f.write_str(name)
    }
}

/// One flat typed array of field values.
///
/// Rows are addressed by plain index; validity of a row is the owner's
/// concern. Growth preserves existing rows exactly and zero-fills the rest.
#[derive(Clone, Debug)]
pub enum Column {
    /// `f32` backing storage.
    F32(Vec<f32>),
    /// `f64` backing storage.
    F64(Vec<f64>),
    /// `i8` backing storage.
    I8(Vec<i8>),
    /// `i16` backing storage.
    I16(Vec<i16>),
    /// `i32` backing storage.
    I32(Vec<i32>),
    /// `u8` backing storage.
    U8(Vec<u8>),
    /// `u16` backing storage.
    U16(Vec<u16>),
    /// `u32` backing storage.
    U32(Vec<u32>),
}

macro_rules! for_each_column {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            Column::F32($v) => $body,
            Column::F64($v) => $body,
            Column::I8($v) => $body,
            Column::I16($v) => $body,
            Column::I32($v) => $body,
            Column::U8($v) => $body,
            Column::U16($v) => $body,
            Column::U32($v) => $body,
        }
    };
}

macro_rules! for_each_column_pair {
    ($a:expr, $b:expr, $x:ident, $y:ident => $body:expr) => {
        match ($a, $b) {
            (Column::F32($x), Column::F32($y)) => $body,
            (Column::F64($x), Column::F64($y)) => $body,
            (Column::I8($x), Column::I8($y)) => $body,
            (Column::I16($x), Column::I16($y)) => $body,
            (Column::I32($x), Column::I32($y)) => $body,
            (Column::U8($x), Column::U8($y)) => $body,
            (Column::U16($x), Column::U16($y)) => $body,
            (Column::U32($x), Column::U32($y)) => $body,
            _ => panic!("column backing type mismatch"),
        }
    };
}

macro_rules! typed_accessors {
    ($($variant:ident, $ty:ty, $as_ref:ident, $as_mut:ident;)*) => {
        $(
            /// Borrows the backing array if this column stores that type.
            pub fn $as_ref(&self) -> Option<&[$ty]> {
                match self {
                    Column::$variant(v) => Some(v),
                    _ => None,
                }
            }

            /// Mutably borrows the backing array if this column stores that type.
            pub fn $as_mut(&mut self) -> Option<&mut [$ty]> {
                match self {
                    Column::$variant(v) => Some(v),
                    _ => None,
                }
            }
        )*
    };
}

impl Column {
    /// Allocates a zero-filled column of `capacity` rows.
    pub fn new(ty: FieldType, capacity: usize) -> Self {
        match ty {
            FieldType::F32 => Column::F32(vec![0.0; capacity]),
            FieldType::F64 => Column::F64(vec![0.0; capacity]),
            FieldType::I8 => Column::I8(vec![0; capacity]),
            FieldType::I16 => Column::I16(vec![0; capacity]),
            FieldType::I32 => Column::I32(vec![0; capacity]),
            FieldType::U8 => Column::U8(vec![0; capacity]),
            FieldType::U16 => Column::U16(vec![0; capacity]),
            FieldType::U32 => Column::U32(vec![0; capacity]),
        }
    }

    /// The backing type of this column.
    pub fn field_type(&self) -> FieldType {
        match self {
            Column::F32(_) => FieldType::F32,
            Column::F64(_) => FieldType::F64,
            Column::I8(_) => FieldType::I8,
            Column::I16(_) => FieldType::I16,
            Column::I32(_) => FieldType::I32,
            Column::U8(_) => FieldType::U8,
            Column::U16(_) => FieldType::U16,
            Column::U32(_) => FieldType::U32,
        }
    }

    /// Physical row capacity.
    #[inline]
    pub fn len(&self) -> usize {
        for_each_column!(self, v => v.len())
    }

    /// Returns `true` if the column has no physical rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grows physical storage to at least `needed` rows by doubling,
    /// preserving existing rows and zero-filling the remainder.
    pub fn grow_to(&mut self, needed: usize) {
        let current = self.len();
        if needed <= current {
            return;
        }
        let target = needed.max(current.saturating_mul(2)).max(1);
        for_each_column!(self, v => v.resize(target, Default::default()));
    }

    /// Reads row `index` widened to `f64`.
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        for_each_column!(self, v => v[index] as f64)
    }

    /// Writes row `index`, narrowing from `f64` into the backing type.
    #[inline]
    pub fn set(&mut self, index: usize, value: f64) {
        match self {
            Column::F32(v) => v[index] = value as f32,
            Column::F64(v) => v[index] = value,
            Column::I8(v) => v[index] = value as i8,
            Column::I16(v) => v[index] = value as i16,
            Column::I32(v) => v[index] = value as i32,
            Column::U8(v) => v[index] = value as u8,
            Column::U16(v) => v[index] = value as u16,
            Column::U32(v) => v[index] = value as u32,
        }
    }

    /// Copies row `src` over row `dst` within this column.
    #[inline]
    pub fn copy_row_within(&mut self, src: usize, dst: usize) {
        for_each_column!(self, v => v[dst] = v[src])
    }

    /// Copies one row out of `other` into row `dst` of this column.
    ///
    /// Both columns must share a backing type; the registry guarantees this
    /// for columns belonging to the same component field.
    #[inline]
    pub fn copy_row_from(&mut self, dst: usize, other: &Column, src: usize) {
        for_each_column_pair!(self, other, a, b => a[dst] = b[src])
    }

    /// Bulk-copies `len` rows starting at `src` in `other` into this column
    /// starting at `dst`. Used by whole-archetype moves.
    pub fn copy_range_from(&mut self, dst: usize, other: &Column, src: usize, len: usize) {
        for_each_column_pair!(self, other, a, b => {
            a[dst..dst + len].copy_from_slice(&b[src..src + len])
        })
    }

    /// Broadcasts `value` over `len` rows starting at `start`.
    pub fn fill_range(&mut self, start: usize, len: usize, value: f64) {
        for i in start..start + len {
            self.set(i, value);
        }
    }

    /// Overwrites row `index` with a poison pattern: NaN for floats,
    /// all-bits-set for integers.
    pub fn poison(&mut self, index: usize) {
        match self {
            Column::F32(v) => v[index] = f32::NAN,
            Column::F64(v) => v[index] = f64::NAN,
            Column::I8(v) => v[index] = !0,
            Column::I16(v) => v[index] = !0,
            Column::I32(v) => v[index] = !0,
            Column::U8(v) => v[index] = !0,
            Column::U16(v) => v[index] = !0,
            Column::U32(v) => v[index] = !0,
        }
    }

    typed_accessors! {
        F32, f32, as_f32, as_f32_mut;
        F64, f64, as_f64, as_f64_mut;
        I8, i8, as_i8, as_i8_mut;
        I16, i16, as_i16, as_i16_mut;
        I32, i32, as_i32, as_i32_mut;
        U8, u8, as_u8, as_u8_mut;
        U16, u16, as_u16, as_u16_mut;
        U32, u32, as_u32, as_u32_mut;
    }
}

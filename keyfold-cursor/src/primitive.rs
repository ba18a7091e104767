//! Cursors over fixed-width primitive arrays, booleans, and opaque columns.

use arrow::array::{
    Array, ArrayRef, BooleanArray, BooleanBuilder, PrimitiveArray, PrimitiveBuilder,
    new_empty_array,
};
use arrow::datatypes::{ArrowPrimitiveType, DataType};
use keyfold_result::{Error, Result};

use crate::Cursor;

/// Cursor over a [`PrimitiveArray`] of a fixed native type.
///
/// `next_value`/`value_at` return whatever sits in the value buffer; for a
/// null row that is an arbitrary native, so callers must consult the null
/// bit first (the aggregate functions do this through `next_if_null`).
pub struct PrimitiveCursor<T: ArrowPrimitiveType> {
    array: PrimitiveArray<T>,
    pos: usize,
}

impl<T: ArrowPrimitiveType> PrimitiveCursor<T> {
    /// Create a detached cursor bound to an empty array.
    pub fn new() -> Self {
        Self {
            array: PrimitiveBuilder::<T>::new().finish(),
            pos: 0,
        }
    }

    /// Read the value at the cursor position and advance.
    #[inline]
    pub fn next_value(&mut self) -> T::Native {
        let value = self.array.value(self.pos);
        self.pos += 1;
        value
    }

    /// Peek at the value at an arbitrary index without moving the cursor.
    #[inline]
    pub fn value_at(&self, idx: usize) -> T::Native {
        self.array.value(idx)
    }
}

impl<T: ArrowPrimitiveType> Default for PrimitiveCursor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ArrowPrimitiveType> Cursor for PrimitiveCursor<T> {
    fn attach(&mut self, array: &ArrayRef) -> Result<()> {
        let typed = array
            .as_any()
            .downcast_ref::<PrimitiveArray<T>>()
            .ok_or_else(|| {
                Error::Internal(format!(
                    "cursor expected a {} array, found {}",
                    T::DATA_TYPE,
                    array.data_type()
                ))
            })?;
        self.array = typed.clone();
        self.pos = 0;
        Ok(())
    }

    #[inline]
    fn len(&self) -> usize {
        self.array.len()
    }

    #[inline]
    fn has_more(&self) -> bool {
        self.pos < self.array.len()
    }

    #[inline]
    fn non_null_count(&self) -> usize {
        self.array.len() - self.array.null_count()
    }

    #[inline]
    fn is_null(&self) -> bool {
        self.pos < self.array.len() && self.array.is_null(self.pos)
    }

    #[inline]
    fn is_null_at(&self, idx: usize) -> bool {
        self.array.is_null(idx)
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }
}

/// Cursor over a [`BooleanArray`].
pub struct BooleanCursor {
    array: BooleanArray,
    pos: usize,
}

impl BooleanCursor {
    pub fn new() -> Self {
        Self {
            array: BooleanBuilder::new().finish(),
            pos: 0,
        }
    }

    /// Read the value at the cursor position and advance.
    #[inline]
    pub fn next_value(&mut self) -> bool {
        let value = self.array.value(self.pos);
        self.pos += 1;
        value
    }

    /// Peek at the value at an arbitrary index without moving the cursor.
    #[inline]
    pub fn value_at(&self, idx: usize) -> bool {
        self.array.value(idx)
    }
}

impl Default for BooleanCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl Cursor for BooleanCursor {
    fn attach(&mut self, array: &ArrayRef) -> Result<()> {
        let typed = array
            .as_any()
            .downcast_ref::<BooleanArray>()
            .ok_or_else(|| {
                Error::Internal(format!(
                    "cursor expected a Boolean array, found {}",
                    array.data_type()
                ))
            })?;
        self.array = typed.clone();
        self.pos = 0;
        Ok(())
    }

    #[inline]
    fn len(&self) -> usize {
        self.array.len()
    }

    #[inline]
    fn has_more(&self) -> bool {
        self.pos < self.array.len()
    }

    #[inline]
    fn non_null_count(&self) -> usize {
        self.array.len() - self.array.null_count()
    }

    #[inline]
    fn is_null(&self) -> bool {
        self.pos < self.array.len() && self.array.is_null(self.pos)
    }

    #[inline]
    fn is_null_at(&self, idx: usize) -> bool {
        self.array.is_null(idx)
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }
}

/// Null-query-only cursor for nested and otherwise opaque columns.
///
/// Also serves COUNT(*), which needs nothing but the row count.
pub struct OpaqueCursor {
    array: ArrayRef,
    pos: usize,
}

impl OpaqueCursor {
    pub fn new(data_type: &DataType) -> Self {
        Self {
            array: new_empty_array(data_type),
            pos: 0,
        }
    }
}

impl Cursor for OpaqueCursor {
    fn attach(&mut self, array: &ArrayRef) -> Result<()> {
        self.array = array.clone();
        self.pos = 0;
        Ok(())
    }

    #[inline]
    fn len(&self) -> usize {
        self.array.len()
    }

    #[inline]
    fn has_more(&self) -> bool {
        self.pos < self.array.len()
    }

    #[inline]
    fn non_null_count(&self) -> usize {
        self.array.len() - self.array.null_count()
    }

    #[inline]
    fn is_null(&self) -> bool {
        self.pos < self.array.len() && self.array.is_null(self.pos)
    }

    #[inline]
    fn is_null_at(&self, idx: usize) -> bool {
        self.array.is_null(idx)
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int32Array;
    use arrow::datatypes::Int32Type;
    use std::sync::Arc;

    fn attach_i32(values: Vec<Option<i32>>) -> PrimitiveCursor<Int32Type> {
        let array: ArrayRef = Arc::new(Int32Array::from(values));
        let mut cursor = PrimitiveCursor::<Int32Type>::new();
        cursor.attach(&array).unwrap();
        cursor
    }

    #[test]
    fn walks_values_and_nulls_in_order() {
        let mut cursor = attach_i32(vec![Some(1), None, Some(3)]);
        assert_eq!(cursor.len(), 3);
        assert_eq!(cursor.non_null_count(), 2);
        assert!(!cursor.next_if_null());
        assert_eq!(cursor.next_value(), 1);
        assert!(cursor.next_if_null());
        assert!(!cursor.next_if_null());
        assert_eq!(cursor.next_value(), 3);
        assert!(!cursor.has_more());
        assert!(!cursor.is_null());
    }

    #[test]
    fn positional_access_does_not_move_the_cursor() {
        let cursor = attach_i32(vec![Some(7), None, Some(9)]);
        assert!(!cursor.is_null_at(0));
        assert!(cursor.is_null_at(1));
        assert_eq!(cursor.value_at(2), 9);
        assert!(cursor.has_more());
    }

    #[test]
    fn sliced_arrays_honor_offsets() {
        let array: ArrayRef = Arc::new(Int32Array::from(vec![Some(1), None, Some(3), Some(4)]));
        let sliced = array.slice(1, 3);
        let mut cursor = PrimitiveCursor::<Int32Type>::new();
        cursor.attach(&sliced).unwrap();
        assert_eq!(cursor.len(), 3);
        assert!(cursor.next_null());
        assert_eq!(cursor.next_value(), 3);
    }

    #[test]
    fn attach_rejects_mismatched_arrays() {
        let array: ArrayRef = Arc::new(arrow::array::StringArray::from(vec!["a"]));
        let mut cursor = PrimitiveCursor::<Int32Type>::new();
        assert!(cursor.attach(&array).is_err());
    }

    #[test]
    fn empty_cursor_reports_exhaustion() {
        let cursor = PrimitiveCursor::<Int32Type>::new();
        assert!(!cursor.has_more());
        assert!(!cursor.is_null());
        assert_eq!(cursor.len(), 0);
    }
}

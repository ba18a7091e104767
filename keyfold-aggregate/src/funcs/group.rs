//! Group-key builders: pseudo-functions that project the first-seen value of
//! a key column into the output row of its group.
//!
//! The driver calls `init(row_idx)` once when a group is created and never
//! updates these entries again, so the cursor is read positionally and the
//! batch-wise entry points are internal-invariant errors.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanBuilder, PrimitiveBuilder, new_empty_array, new_null_array,
};
use arrow::compute::concat;
use arrow::datatypes::{ArrowPrimitiveType, DataType};
use keyfold_cursor::{BooleanCursor, BytesCursor, Cursor, PrimitiveCursor};
use keyfold_result::{Error, Result};

use crate::funcs::AggFunc;
use crate::funcs::bytes::ByteColumnBuilder;
use crate::state::{AggState, StateSlot, state_mismatch};

fn not_updatable() -> Error {
    Error::Internal("group key builders are frozen after the first row of a group".into())
}

/// Key projection for fixed-width primitive columns.
pub struct GroupBuilderFunc<T: ArrowPrimitiveType>
where
    T::Native: StateSlot,
{
    data_type: DataType,
    cursor: PrimitiveCursor<T>,
    builder: PrimitiveBuilder<T>,
}

impl<T: ArrowPrimitiveType> GroupBuilderFunc<T>
where
    T::Native: StateSlot,
{
    pub fn new(data_type: DataType) -> Self {
        let builder = PrimitiveBuilder::<T>::new().with_data_type(data_type.clone());
        Self {
            data_type,
            cursor: PrimitiveCursor::new(),
            builder,
        }
    }
}

impl<T: ArrowPrimitiveType> AggFunc for GroupBuilderFunc<T>
where
    T::Native: StateSlot,
{
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, row_idx: usize) -> Result<AggState> {
        if self.cursor.is_null_at(row_idx) {
            Ok(T::Native::empty())
        } else {
            Ok(T::Native::store(self.cursor.value_at(row_idx)))
        }
    }

    fn update(&mut self, _state: &mut AggState) -> Result<()> {
        Err(not_updatable())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        Err(not_updatable())
    }

    fn update_batch(&mut self, _state: &mut AggState) -> Result<()> {
        Err(not_updatable())
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder =
            PrimitiveBuilder::<T>::with_capacity(capacity).with_data_type(self.data_type.clone());
    }

    fn summarize(&mut self, state: &AggState) -> Result<()> {
        self.builder.append_option(T::Native::load(state)?);
        Ok(())
    }

    fn result(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn data_type(&self) -> DataType {
        self.data_type.clone()
    }
}

/// Key projection for boolean columns.
pub struct BoolGroupFunc {
    cursor: BooleanCursor,
    builder: BooleanBuilder,
}

impl BoolGroupFunc {
    pub fn new() -> Self {
        Self {
            cursor: BooleanCursor::new(),
            builder: BooleanBuilder::new(),
        }
    }
}

impl Default for BoolGroupFunc {
    fn default() -> Self {
        Self::new()
    }
}

impl AggFunc for BoolGroupFunc {
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, row_idx: usize) -> Result<AggState> {
        if self.cursor.is_null_at(row_idx) {
            Ok(AggState::Bool(None))
        } else {
            Ok(AggState::Bool(Some(self.cursor.value_at(row_idx))))
        }
    }

    fn update(&mut self, _state: &mut AggState) -> Result<()> {
        Err(not_updatable())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        Err(not_updatable())
    }

    fn update_batch(&mut self, _state: &mut AggState) -> Result<()> {
        Err(not_updatable())
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder = BooleanBuilder::with_capacity(capacity);
    }

    fn summarize(&mut self, state: &AggState) -> Result<()> {
        match state {
            AggState::Bool(slot) => {
                self.builder.append_option(*slot);
                Ok(())
            }
            other => Err(state_mismatch("Bool", other)),
        }
    }

    fn result(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn data_type(&self) -> DataType {
        DataType::Boolean
    }
}

/// Key projection for byte-view columns (strings, binaries, decimals).
pub struct BytesGroupFunc {
    data_type: DataType,
    cursor: BytesCursor,
    builder: ByteColumnBuilder,
}

impl BytesGroupFunc {
    pub fn new(data_type: DataType) -> Result<Self> {
        Ok(Self {
            cursor: BytesCursor::new(&data_type)?,
            builder: ByteColumnBuilder::with_capacity(&data_type, 0)?,
            data_type,
        })
    }
}

impl AggFunc for BytesGroupFunc {
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, row_idx: usize) -> Result<AggState> {
        if self.cursor.is_null_at(row_idx) {
            Ok(AggState::Bytes(None))
        } else {
            Ok(AggState::Bytes(Some(
                self.cursor.bytes_at(row_idx).into_owned(),
            )))
        }
    }

    fn update(&mut self, _state: &mut AggState) -> Result<()> {
        Err(not_updatable())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        Err(not_updatable())
    }

    fn update_batch(&mut self, _state: &mut AggState) -> Result<()> {
        Err(not_updatable())
    }

    fn reserve(&mut self, capacity: usize) {
        if let Ok(builder) = ByteColumnBuilder::with_capacity(&self.data_type, capacity) {
            self.builder = builder;
        }
    }

    fn summarize(&mut self, state: &AggState) -> Result<()> {
        match state {
            AggState::Bytes(Some(bytes)) => self.builder.append_bytes(bytes),
            AggState::Bytes(None) => {
                self.builder.append_null();
                Ok(())
            }
            other => Err(state_mismatch("Bytes", other)),
        }
    }

    fn result(&mut self) -> Result<ArrayRef> {
        Ok(self.builder.finish())
    }

    fn data_type(&self) -> DataType {
        self.data_type.clone()
    }
}

/// Key projection for opaque and nested columns.
///
/// No typed accessor exists for these, so the first-seen value is captured
/// as a one-row zero-copy slice of the batch column and the output column is
/// the concatenation of the captured slices.
pub struct OpaqueGroupFunc {
    data_type: DataType,
    array: ArrayRef,
    pieces: Vec<ArrayRef>,
}

impl OpaqueGroupFunc {
    pub fn new(data_type: DataType) -> Self {
        Self {
            array: new_empty_array(&data_type),
            data_type,
            pieces: Vec::new(),
        }
    }
}

impl AggFunc for OpaqueGroupFunc {
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.array = array.clone();
        Ok(())
    }

    fn init(&mut self, row_idx: usize) -> Result<AggState> {
        if self.array.is_null(row_idx) {
            Ok(AggState::Slice(None))
        } else {
            Ok(AggState::Slice(Some(self.array.slice(row_idx, 1))))
        }
    }

    fn update(&mut self, _state: &mut AggState) -> Result<()> {
        Err(not_updatable())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        Err(not_updatable())
    }

    fn update_batch(&mut self, _state: &mut AggState) -> Result<()> {
        Err(not_updatable())
    }

    fn reserve(&mut self, capacity: usize) {
        self.pieces.reserve(capacity);
    }

    fn summarize(&mut self, state: &AggState) -> Result<()> {
        match state {
            AggState::Slice(Some(piece)) => {
                self.pieces.push(piece.clone());
                Ok(())
            }
            AggState::Slice(None) => {
                self.pieces.push(new_null_array(&self.data_type, 1));
                Ok(())
            }
            other => Err(state_mismatch("Slice", other)),
        }
    }

    fn result(&mut self) -> Result<ArrayRef> {
        if self.pieces.is_empty() {
            return Ok(new_empty_array(&self.data_type));
        }
        let refs: Vec<&dyn arrow::array::Array> =
            self.pieces.iter().map(|piece| piece.as_ref()).collect();
        let merged = concat(&refs)?;
        self.pieces.clear();
        Ok(merged)
    }

    fn data_type(&self) -> DataType {
        self.data_type.clone()
    }
}

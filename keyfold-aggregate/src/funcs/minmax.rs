//! MIN and MAX over primitive, boolean, and byte-view columns.

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanBuilder, PrimitiveBuilder};
use arrow::datatypes::{ArrowPrimitiveType, DataType};
use keyfold_cursor::{BooleanCursor, BytesCursor, Cursor, PrimitiveCursor};
use keyfold_result::Result;

use crate::funcs::AggFunc;
use crate::funcs::bytes::ByteColumnBuilder;
use crate::state::{AggState, NativeOrd, StateSlot, state_mismatch};

/// MIN/MAX over a fixed-width primitive column. The same object serves both
/// extremes: a candidate replaces the current best iff `(candidate < best)`
/// XOR `is_max`.
pub struct MinMaxFunc<T: ArrowPrimitiveType>
where
    T::Native: StateSlot + NativeOrd,
{
    is_max: bool,
    data_type: DataType,
    cursor: PrimitiveCursor<T>,
    builder: PrimitiveBuilder<T>,
}

impl<T: ArrowPrimitiveType> MinMaxFunc<T>
where
    T::Native: StateSlot + NativeOrd,
{
    pub fn new(is_max: bool, data_type: DataType) -> Self {
        let builder = PrimitiveBuilder::<T>::new().with_data_type(data_type.clone());
        Self {
            is_max,
            data_type,
            cursor: PrimitiveCursor::new(),
            builder,
        }
    }
}

impl<T: ArrowPrimitiveType> AggFunc for MinMaxFunc<T>
where
    T::Native: StateSlot + NativeOrd,
{
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, _row_idx: usize) -> Result<AggState> {
        if self.cursor.next_if_null() {
            Ok(T::Native::empty())
        } else {
            Ok(T::Native::store(self.cursor.next_value()))
        }
    }

    fn update(&mut self, state: &mut AggState) -> Result<()> {
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = self.cursor.next_value();
        match T::Native::load(state)? {
            None => *state = T::Native::store(value),
            Some(current) => {
                if NativeOrd::lt(&value, &current) ^ self.is_max {
                    *state = T::Native::store(value);
                }
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        if !self.cursor.has_more() {
            return Ok(T::Native::empty());
        }
        self.init(0)
    }

    fn update_batch(&mut self, state: &mut AggState) -> Result<()> {
        while self.cursor.has_more() {
            self.update(state)?;
        }
        Ok(())
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

/// MIN/MAX over a boolean column (`false < true`).
pub struct BoolMinMaxFunc {
    is_max: bool,
    cursor: BooleanCursor,
    builder: BooleanBuilder,
}

impl BoolMinMaxFunc {
    pub fn new(is_max: bool) -> Self {
        Self {
            is_max,
            cursor: BooleanCursor::new(),
            builder: BooleanBuilder::new(),
        }
    }
}

impl AggFunc for BoolMinMaxFunc {
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, _row_idx: usize) -> Result<AggState> {
        if self.cursor.next_if_null() {
            Ok(AggState::Bool(None))
        } else {
            Ok(AggState::Bool(Some(self.cursor.next_value())))
        }
    }

    fn update(&mut self, state: &mut AggState) -> Result<()> {
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = self.cursor.next_value();
        match state {
            AggState::Bool(slot) => {
                match slot {
                    None => *slot = Some(value),
                    Some(current) => {
                        if (value < *current) ^ self.is_max {
                            *current = value;
                        }
                    }
                }
                Ok(())
            }
            other => Err(state_mismatch("Bool", other)),
        }
    }

    fn init_batch(&mut self) -> Result<AggState> {
        if !self.cursor.has_more() {
            return Ok(AggState::Bool(None));
        }
        self.init(0)
    }

    fn update_batch(&mut self, state: &mut AggState) -> Result<()> {
        while self.cursor.has_more() {
            self.update(state)?;
        }
        Ok(())
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

/// MIN/MAX over byte-view columns: strings, binaries, fixed-size binary,
/// decimals. Comparison is lexicographic on the byte view; the state owns
/// the current best bytes.
pub struct BytesMinMaxFunc {
    is_max: bool,
    data_type: DataType,
    cursor: BytesCursor,
    builder: ByteColumnBuilder,
}

impl BytesMinMaxFunc {
    pub fn new(is_max: bool, data_type: DataType) -> Result<Self> {
        Ok(Self {
            is_max,
            cursor: BytesCursor::new(&data_type)?,
            builder: ByteColumnBuilder::with_capacity(&data_type, 0)?,
            data_type,
        })
    }
}

impl AggFunc for BytesMinMaxFunc {
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, _row_idx: usize) -> Result<AggState> {
        if self.cursor.next_if_null() {
            Ok(AggState::Bytes(None))
        } else {
            Ok(AggState::Bytes(Some(self.cursor.next_bytes().into_owned())))
        }
    }

    fn update(&mut self, state: &mut AggState) -> Result<()> {
        let slot = match state {
            AggState::Bytes(slot) => slot,
            other => return Err(state_mismatch("Bytes", other)),
        };
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = self.cursor.next_bytes();
        match slot {
            None => *slot = Some(value.into_owned()),
            Some(current) => {
                if (value.as_ref() < current.as_slice()) ^ self.is_max {
                    *current = value.into_owned();
                }
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        if !self.cursor.has_more() {
            return Ok(AggState::Bytes(None));
        }
        self.init(0)
    }

    fn update_batch(&mut self, state: &mut AggState) -> Result<()> {
        while self.cursor.has_more() {
            self.update(state)?;
        }
        Ok(())
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

//! COUNT and COUNT(*).

use std::sync::Arc;

use arrow::array::{ArrayRef, UInt64Builder};
use arrow::datatypes::DataType;
use keyfold_cursor::{Cursor, OpaqueCursor, cursor_for};
use keyfold_result::Result;

use crate::funcs::AggFunc;
use crate::state::{AggState, state_mismatch};

/// COUNT(*): counts rows, nulls included. Never null in the output, and in
/// one-group mode its state exists even over empty input, yielding 0.
pub struct CountStarFunc {
    cursor: OpaqueCursor,
    builder: UInt64Builder,
}

impl CountStarFunc {
    pub fn new() -> Self {
        Self {
            cursor: OpaqueCursor::new(&DataType::Null),
            builder: UInt64Builder::new(),
        }
    }
}

impl Default for CountStarFunc {
    fn default() -> Self {
        Self::new()
    }
}

impl AggFunc for CountStarFunc {
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, _row_idx: usize) -> Result<AggState> {
        Ok(AggState::Count(1))
    }

    fn update(&mut self, state: &mut AggState) -> Result<()> {
        match state {
            AggState::Count(count) => {
                *count += 1;
                Ok(())
            }
            other => Err(state_mismatch("Count", other)),
        }
    }

    fn init_batch(&mut self) -> Result<AggState> {
        Ok(AggState::Count(0))
    }

    fn update_batch(&mut self, state: &mut AggState) -> Result<()> {
        match state {
            AggState::Count(count) => {
                *count += self.cursor.len() as u64;
                Ok(())
            }
            other => Err(state_mismatch("Count", other)),
        }
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder = UInt64Builder::with_capacity(capacity);
    }

    fn summarize(&mut self, state: &AggState) -> Result<()> {
        match state {
            AggState::Count(count) => {
                self.builder.append_value(*count);
                Ok(())
            }
            other => Err(state_mismatch("Count", other)),
        }
    }

    fn result(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn data_type(&self) -> DataType {
        DataType::UInt64
    }
}

/// COUNT(expr): counts non-null rows of the input column. Works over any
/// column type, nested ones included, since only the null bitmap is read.
pub struct CountFunc {
    cursor: Box<dyn Cursor>,
    builder: UInt64Builder,
}

impl CountFunc {
    pub fn new() -> Self {
        Self {
            cursor: Box::new(OpaqueCursor::new(&DataType::Null)),
            builder: UInt64Builder::new(),
        }
    }
}

impl Default for CountFunc {
    fn default() -> Self {
        Self::new()
    }
}

impl AggFunc for CountFunc {
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor = cursor_for(array.data_type())?;
        self.cursor.attach(array)
    }

    fn init(&mut self, _row_idx: usize) -> Result<AggState> {
        let initial = if self.cursor.next_null() { 0 } else { 1 };
        Ok(AggState::Count(initial))
    }

    fn update(&mut self, state: &mut AggState) -> Result<()> {
        let increment = if self.cursor.next_null() { 0 } else { 1 };
        match state {
            AggState::Count(count) => {
                *count += increment;
                Ok(())
            }
            other => Err(state_mismatch("Count", other)),
        }
    }

    fn init_batch(&mut self) -> Result<AggState> {
        Ok(AggState::Count(0))
    }

    fn update_batch(&mut self, state: &mut AggState) -> Result<()> {
        match state {
            AggState::Count(count) => {
                *count += self.cursor.non_null_count() as u64;
                Ok(())
            }
            other => Err(state_mismatch("Count", other)),
        }
    }

    fn reserve(&mut self, capacity: usize) {
        self.builder = UInt64Builder::with_capacity(capacity);
    }

    fn summarize(&mut self, state: &AggState) -> Result<()> {
        match state {
            AggState::Count(count) => {
                self.builder.append_value(*count);
                Ok(())
            }
            other => Err(state_mismatch("Count", other)),
        }
    }

    fn result(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn data_type(&self) -> DataType {
        DataType::UInt64
    }
}

//! AVG over numeric, time, and duration columns.
//!
//! Each state is a `(accumulator, count)` pair. Inputs up to 32 bits keep a
//! widened 64-bit integer accumulator; 64-bit integers keep a [`Wide128`];
//! floats, times, and durations divide in `f64`. Outputs are `f32` for
//! inputs of 16 bits or less and `f64` otherwise.

use std::sync::Arc;

use arrow::array::{ArrayRef, PrimitiveBuilder};
use arrow::datatypes::{ArrowPrimitiveType, DataType, Float64Type};
use keyfold_cursor::{Cursor, PrimitiveCursor};
use keyfold_result::{Error, Result};
use keyfold_wideint::Wide128;

use crate::funcs::{AggFunc, FromF64, IntoWide, WidenF64, WidenI64, WidenU64};
use crate::state::{AggState, state_mismatch};

fn avg_overflow() -> Error {
    Error::Overflow("AVG accumulator exceeded its 64-bit range".into())
}

/// AVG with a widened `i64` accumulator: signed ints up to 32 bits, time32,
/// time64, duration.
pub struct AvgIntFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: WidenI64,
    Out: ArrowPrimitiveType,
    Out::Native: FromF64,
{
    cursor: PrimitiveCursor<In>,
    builder: PrimitiveBuilder<Out>,
}

impl<In, Out> AvgIntFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: WidenI64,
    Out: ArrowPrimitiveType,
    Out::Native: FromF64,
{
    pub fn new() -> Self {
        Self {
            cursor: PrimitiveCursor::new(),
            builder: PrimitiveBuilder::new(),
        }
    }
}

impl<In, Out> Default for AvgIntFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: WidenI64,
    Out: ArrowPrimitiveType,
    Out::Native: FromF64,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<In, Out> AggFunc for AvgIntFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: WidenI64,
    Out: ArrowPrimitiveType,
    Out::Native: FromF64,
{
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, _row_idx: usize) -> Result<AggState> {
        if self.cursor.next_if_null() {
            Ok(AggState::AvgInt(None))
        } else {
            Ok(AggState::AvgInt(Some((self.cursor.next_value().widen(), 1))))
        }
    }

    fn update(&mut self, state: &mut AggState) -> Result<()> {
        let slot = match state {
            AggState::AvgInt(slot) => slot,
            other => return Err(state_mismatch("AvgInt", other)),
        };
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = self.cursor.next_value().widen();
        match slot {
            None => *slot = Some((value, 1)),
            Some((sum, count)) => {
                *sum = sum.checked_add(value).ok_or_else(avg_overflow)?;
                *count += 1;
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        if !self.cursor.has_more() {
            return Ok(AggState::AvgInt(None));
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
        self.builder = PrimitiveBuilder::with_capacity(capacity);
    }

    fn summarize(&mut self, state: &AggState) -> Result<()> {
        match state {
            AggState::AvgInt(Some((sum, count))) => {
                let avg = *sum as f64 / *count as f64;
                self.builder.append_value(Out::Native::from_f64(avg));
                Ok(())
            }
            AggState::AvgInt(None) => {
                self.builder.append_null();
                Ok(())
            }
            other => Err(state_mismatch("AvgInt", other)),
        }
    }

    fn result(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn data_type(&self) -> DataType {
        Out::DATA_TYPE
    }
}

/// AVG with a widened `u64` accumulator: unsigned ints up to 32 bits.
pub struct AvgUIntFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: WidenU64,
    Out: ArrowPrimitiveType,
    Out::Native: FromF64,
{
    cursor: PrimitiveCursor<In>,
    builder: PrimitiveBuilder<Out>,
}

impl<In, Out> AvgUIntFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: WidenU64,
    Out: ArrowPrimitiveType,
    Out::Native: FromF64,
{
    pub fn new() -> Self {
        Self {
            cursor: PrimitiveCursor::new(),
            builder: PrimitiveBuilder::new(),
        }
    }
}

impl<In, Out> Default for AvgUIntFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: WidenU64,
    Out: ArrowPrimitiveType,
    Out::Native: FromF64,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<In, Out> AggFunc for AvgUIntFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: WidenU64,
    Out: ArrowPrimitiveType,
    Out::Native: FromF64,
{
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, _row_idx: usize) -> Result<AggState> {
        if self.cursor.next_if_null() {
            Ok(AggState::AvgUInt(None))
        } else {
            Ok(AggState::AvgUInt(Some((
                self.cursor.next_value().widen(),
                1,
            ))))
        }
    }

    fn update(&mut self, state: &mut AggState) -> Result<()> {
        let slot = match state {
            AggState::AvgUInt(slot) => slot,
            other => return Err(state_mismatch("AvgUInt", other)),
        };
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = self.cursor.next_value().widen();
        match slot {
            None => *slot = Some((value, 1)),
            Some((sum, count)) => {
                *sum = sum.checked_add(value).ok_or_else(avg_overflow)?;
                *count += 1;
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        if !self.cursor.has_more() {
            return Ok(AggState::AvgUInt(None));
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
        self.builder = PrimitiveBuilder::with_capacity(capacity);
    }

    fn summarize(&mut self, state: &AggState) -> Result<()> {
        match state {
            AggState::AvgUInt(Some((sum, count))) => {
                let avg = *sum as f64 / *count as f64;
                self.builder.append_value(Out::Native::from_f64(avg));
                Ok(())
            }
            AggState::AvgUInt(None) => {
                self.builder.append_null();
                Ok(())
            }
            other => Err(state_mismatch("AvgUInt", other)),
        }
    }

    fn result(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn data_type(&self) -> DataType {
        Out::DATA_TYPE
    }
}

/// AVG over float columns; accumulates and divides in `f64`.
pub struct AvgFloatFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: WidenF64,
{
    cursor: PrimitiveCursor<In>,
    builder: PrimitiveBuilder<Float64Type>,
}

impl<In> AvgFloatFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: WidenF64,
{
    pub fn new() -> Self {
        Self {
            cursor: PrimitiveCursor::new(),
            builder: PrimitiveBuilder::new(),
        }
    }
}

impl<In> Default for AvgFloatFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: WidenF64,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<In> AggFunc for AvgFloatFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: WidenF64,
{
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, _row_idx: usize) -> Result<AggState> {
        if self.cursor.next_if_null() {
            Ok(AggState::AvgFloat(None))
        } else {
            Ok(AggState::AvgFloat(Some((
                self.cursor.next_value().widen(),
                1,
            ))))
        }
    }

    fn update(&mut self, state: &mut AggState) -> Result<()> {
        let slot = match state {
            AggState::AvgFloat(slot) => slot,
            other => return Err(state_mismatch("AvgFloat", other)),
        };
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = self.cursor.next_value().widen();
        match slot {
            None => *slot = Some((value, 1)),
            Some((sum, count)) => {
                *sum += value;
                *count += 1;
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        if !self.cursor.has_more() {
            return Ok(AggState::AvgFloat(None));
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
        self.builder = PrimitiveBuilder::with_capacity(capacity);
    }

    fn summarize(&mut self, state: &AggState) -> Result<()> {
        match state {
            AggState::AvgFloat(Some((sum, count))) => {
                self.builder.append_value(sum / *count as f64);
                Ok(())
            }
            AggState::AvgFloat(None) => {
                self.builder.append_null();
                Ok(())
            }
            other => Err(state_mismatch("AvgFloat", other)),
        }
    }

    fn result(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn data_type(&self) -> DataType {
        DataType::Float64
    }
}

/// AVG over 64-bit integer columns with the wide accumulator.
///
/// Division splits into integer quotient plus `remainder / count`, both cast
/// to `f64` separately: casting the whole accumulator first would throw away
/// the low bits of sums near the 64-bit boundary.
pub struct AvgWideFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: IntoWide,
{
    cursor: PrimitiveCursor<In>,
    builder: PrimitiveBuilder<Float64Type>,
}

impl<In> AvgWideFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: IntoWide,
{
    pub fn new() -> Self {
        Self {
            cursor: PrimitiveCursor::new(),
            builder: PrimitiveBuilder::new(),
        }
    }
}

impl<In> Default for AvgWideFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: IntoWide,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<In> AggFunc for AvgWideFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: IntoWide,
{
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, _row_idx: usize) -> Result<AggState> {
        if self.cursor.next_if_null() {
            Ok(AggState::AvgWide(None))
        } else {
            Ok(AggState::AvgWide(Some((
                self.cursor.next_value().into_wide(),
                1,
            ))))
        }
    }

    fn update(&mut self, state: &mut AggState) -> Result<()> {
        let slot = match state {
            AggState::AvgWide(slot) => slot,
            other => return Err(state_mismatch("AvgWide", other)),
        };
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = self.cursor.next_value().into_wide();
        match slot {
            None => *slot = Some((value, 1)),
            Some((sum, count)) => {
                *sum = sum.checked_add(value).ok_or_else(|| {
                    Error::Overflow("AVG accumulator exceeded 128 bits".into())
                })?;
                *count += 1;
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        if !self.cursor.has_more() {
            return Ok(AggState::AvgWide(None));
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
        self.builder = PrimitiveBuilder::with_capacity(capacity);
    }

    fn summarize(&mut self, state: &AggState) -> Result<()> {
        match state {
            AggState::AvgWide(Some((sum, count))) => {
                let divisor = Wide128::from(*count);
                let (quotient, remainder) = sum.div_rem(divisor);
                let whole: f64 = quotient
                    .cast()
                    .ok_or_else(|| Error::Internal("wide quotient cast cannot fail".into()))?;
                let fraction: f64 = remainder
                    .cast()
                    .ok_or_else(|| Error::Internal("wide remainder cast cannot fail".into()))?;
                self.builder.append_value(whole + fraction / *count as f64);
                Ok(())
            }
            AggState::AvgWide(None) => {
                self.builder.append_null();
                Ok(())
            }
            other => Err(state_mismatch("AvgWide", other)),
        }
    }

    fn result(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn data_type(&self) -> DataType {
        DataType::Float64
    }
}

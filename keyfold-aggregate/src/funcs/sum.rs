//! SUM over numeric, time, and duration columns.
//!
//! Inputs up to 32 bits accumulate in a widened 64-bit native; time and
//! duration columns accumulate in their own native and keep their unit in
//! the output type. 64-bit integer inputs accumulate in [`Wide128`] and the
//! output column promotes to decimal128 the moment any group's sum stops
//! fitting the input type. The promotion is a visible output-schema change,
//! not an error.

use std::sync::Arc;

use arrow::array::{ArrayRef, Decimal128Builder, PrimitiveBuilder};
use arrow::datatypes::{ArrowPrimitiveType, DECIMAL128_MAX_PRECISION, DataType};
use arrow::util::bit_util;
use keyfold_cursor::{Cursor, PrimitiveCursor};
use keyfold_result::{Error, Result};
use keyfold_wideint::FromWide;

use crate::funcs::{AggFunc, IntoWide, WidenF64, WidenI64, WidenU64};
use crate::state::{AggState, state_mismatch};

fn sum_overflow() -> Error {
    Error::Overflow("SUM accumulator exceeded its 64-bit range".into())
}

/// SUM with a widened `i64` accumulator: signed ints up to 32 bits, time32,
/// time64, duration. `Out` narrows the final sum back into the output
/// native (identity for i64-backed outputs).
pub struct SumIntFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: WidenI64,
    Out: ArrowPrimitiveType,
    Out::Native: TryFrom<i64>,
{
    data_type: DataType,
    cursor: PrimitiveCursor<In>,
    builder: PrimitiveBuilder<Out>,
}

impl<In, Out> SumIntFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: WidenI64,
    Out: ArrowPrimitiveType,
    Out::Native: TryFrom<i64>,
{
    pub fn new(data_type: DataType) -> Self {
        let builder = PrimitiveBuilder::<Out>::new().with_data_type(data_type.clone());
        Self {
            data_type,
            cursor: PrimitiveCursor::new(),
            builder,
        }
    }
}

impl<In, Out> AggFunc for SumIntFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: WidenI64,
    Out: ArrowPrimitiveType,
    Out::Native: TryFrom<i64>,
{
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, _row_idx: usize) -> Result<AggState> {
        if self.cursor.next_if_null() {
            Ok(AggState::Int(None))
        } else {
            Ok(AggState::Int(Some(self.cursor.next_value().widen())))
        }
    }

    fn update(&mut self, state: &mut AggState) -> Result<()> {
        let slot = match state {
            AggState::Int(slot) => slot,
            other => return Err(state_mismatch("Int", other)),
        };
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = self.cursor.next_value().widen();
        match slot {
            None => *slot = Some(value),
            Some(acc) => *acc = acc.checked_add(value).ok_or_else(sum_overflow)?,
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        if !self.cursor.has_more() {
            return Ok(AggState::Int(None));
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
            PrimitiveBuilder::<Out>::with_capacity(capacity).with_data_type(self.data_type.clone());
    }

    fn summarize(&mut self, state: &AggState) -> Result<()> {
        match state {
            AggState::Int(Some(total)) => {
                let narrowed = Out::Native::try_from(*total).map_err(|_| sum_overflow())?;
                self.builder.append_value(narrowed);
                Ok(())
            }
            AggState::Int(None) => {
                self.builder.append_null();
                Ok(())
            }
            other => Err(state_mismatch("Int", other)),
        }
    }

    fn result(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn data_type(&self) -> DataType {
        self.data_type.clone()
    }
}

/// SUM with a widened `u64` accumulator: unsigned ints up to 32 bits.
pub struct SumUIntFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: WidenU64,
{
    cursor: PrimitiveCursor<In>,
    builder: PrimitiveBuilder<arrow::datatypes::UInt64Type>,
}

impl<In> SumUIntFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: WidenU64,
{
    pub fn new() -> Self {
        Self {
            cursor: PrimitiveCursor::new(),
            builder: PrimitiveBuilder::new(),
        }
    }
}

impl<In> Default for SumUIntFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: WidenU64,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<In> AggFunc for SumUIntFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: WidenU64,
{
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, _row_idx: usize) -> Result<AggState> {
        if self.cursor.next_if_null() {
            Ok(AggState::UInt(None))
        } else {
            Ok(AggState::UInt(Some(self.cursor.next_value().widen())))
        }
    }

    fn update(&mut self, state: &mut AggState) -> Result<()> {
        let slot = match state {
            AggState::UInt(slot) => slot,
            other => return Err(state_mismatch("UInt", other)),
        };
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = self.cursor.next_value().widen();
        match slot {
            None => *slot = Some(value),
            Some(acc) => *acc = acc.checked_add(value).ok_or_else(sum_overflow)?,
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        if !self.cursor.has_more() {
            return Ok(AggState::UInt(None));
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
            AggState::UInt(slot) => {
                self.builder.append_option(*slot);
                Ok(())
            }
            other => Err(state_mismatch("UInt", other)),
        }
    }

    fn result(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn data_type(&self) -> DataType {
        DataType::UInt64
    }
}

/// SUM over float columns; halves and singles accumulate in `f64`.
pub struct SumFloatFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: WidenF64,
{
    cursor: PrimitiveCursor<In>,
    builder: PrimitiveBuilder<arrow::datatypes::Float64Type>,
}

impl<In> SumFloatFunc<In>
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

impl<In> Default for SumFloatFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: WidenF64,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<In> AggFunc for SumFloatFunc<In>
where
    In: ArrowPrimitiveType,
    In::Native: WidenF64,
{
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, _row_idx: usize) -> Result<AggState> {
        if self.cursor.next_if_null() {
            Ok(AggState::Float(None))
        } else {
            Ok(AggState::Float(Some(self.cursor.next_value().widen())))
        }
    }

    fn update(&mut self, state: &mut AggState) -> Result<()> {
        let slot = match state {
            AggState::Float(slot) => slot,
            other => return Err(state_mismatch("Float", other)),
        };
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = self.cursor.next_value().widen();
        match slot {
            None => *slot = Some(value),
            Some(acc) => *acc += value,
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        if !self.cursor.has_more() {
            return Ok(AggState::Float(None));
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
            AggState::Float(slot) => {
                self.builder.append_option(*slot);
                Ok(())
            }
            other => Err(state_mismatch("Float", other)),
        }
    }

    fn result(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn data_type(&self) -> DataType {
        DataType::Float64
    }
}

/// SUM over 64-bit integer columns with the wide accumulator and the
/// decimal128 overflow promotion.
pub struct SumWideFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: IntoWide,
    Out: ArrowPrimitiveType,
    Out::Native: FromWide + IntoWide,
{
    data_type: DataType,
    cursor: PrimitiveCursor<In>,
    builder: PrimitiveBuilder<Out>,
    overflow: Option<Decimal128Builder>,
    capacity: usize,
}

impl<In, Out> SumWideFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: IntoWide,
    Out: ArrowPrimitiveType,
    Out::Native: FromWide + IntoWide,
{
    pub fn new(data_type: DataType) -> Self {
        let builder = PrimitiveBuilder::<Out>::new().with_data_type(data_type.clone());
        Self {
            data_type,
            cursor: PrimitiveCursor::new(),
            builder,
            overflow: None,
            capacity: 0,
        }
    }

    fn decimal_type() -> DataType {
        DataType::Decimal128(DECIMAL128_MAX_PRECISION, 0)
    }

    /// Switch to decimal output: allocate the decimal builder and replay
    /// every group summarized so far from the integer builder's buffers.
    fn promote_to_decimal(&mut self) -> Decimal128Builder {
        tracing::debug!(
            output = %self.data_type,
            "SUM result no longer fits its integer type, promoting output to decimal128"
        );
        let values = self.builder.values_slice();
        let validity = self.builder.validity_slice();
        let mut decimal = Decimal128Builder::with_capacity(self.capacity.max(values.len()))
            .with_data_type(Self::decimal_type());
        for (idx, value) in values.iter().enumerate() {
            let valid = validity.map_or(true, |bits| bit_util::get_bit(bits, idx));
            if valid {
                decimal.append_value(value.to_i128());
            } else {
                decimal.append_null();
            }
        }
        decimal
    }
}

impl<In, Out> AggFunc for SumWideFunc<In, Out>
where
    In: ArrowPrimitiveType,
    In::Native: IntoWide,
    Out: ArrowPrimitiveType,
    Out::Native: FromWide + IntoWide,
{
    fn bind(&mut self, array: &ArrayRef) -> Result<()> {
        self.cursor.attach(array)
    }

    fn init(&mut self, _row_idx: usize) -> Result<AggState> {
        if self.cursor.next_if_null() {
            Ok(AggState::Wide(None))
        } else {
            Ok(AggState::Wide(Some(self.cursor.next_value().into_wide())))
        }
    }

    fn update(&mut self, state: &mut AggState) -> Result<()> {
        let slot = match state {
            AggState::Wide(slot) => slot,
            other => return Err(state_mismatch("Wide", other)),
        };
        if self.cursor.next_if_null() {
            return Ok(());
        }
        let value = self.cursor.next_value().into_wide();
        match slot {
            None => *slot = Some(value),
            Some(acc) => {
                *acc = acc.checked_add(value).ok_or_else(|| {
                    Error::Overflow("SUM accumulator exceeded 128 bits".into())
                })?;
            }
        }
        Ok(())
    }

    fn init_batch(&mut self) -> Result<AggState> {
        if !self.cursor.has_more() {
            return Ok(AggState::Wide(None));
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
        self.capacity = capacity;
        self.builder =
            PrimitiveBuilder::<Out>::with_capacity(capacity).with_data_type(self.data_type.clone());
    }

    fn summarize(&mut self, state: &AggState) -> Result<()> {
        let slot = match state {
            AggState::Wide(slot) => slot,
            other => return Err(state_mismatch("Wide", other)),
        };
        if let Some(decimal) = self.overflow.as_mut() {
            match slot {
                Some(total) => decimal.append_value(total.to_i128()),
                None => decimal.append_null(),
            }
            return Ok(());
        }
        match slot {
            None => self.builder.append_null(),
            Some(total) => match total.cast::<Out::Native>() {
                Some(narrowed) => self.builder.append_value(narrowed),
                None => {
                    let mut decimal = self.promote_to_decimal();
                    decimal.append_value(total.to_i128());
                    self.overflow = Some(decimal);
                }
            },
        }
        Ok(())
    }

    fn result(&mut self) -> Result<ArrayRef> {
        match self.overflow.as_mut() {
            Some(decimal) => Ok(Arc::new(decimal.finish())),
            None => Ok(Arc::new(self.builder.finish())),
        }
    }

    fn data_type(&self) -> DataType {
        if self.overflow.is_some() {
            Self::decimal_type()
        } else {
            self.data_type.clone()
        }
    }
}

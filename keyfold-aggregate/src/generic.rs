//! Fallback hash aggregation over structural scalar keys.

use arrow::array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Decimal128Array, Decimal256Array,
    FixedSizeBinaryArray, LargeBinaryArray, LargeStringArray, PrimitiveArray, RecordBatch,
    StringArray,
};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Date32Type, Date64Type, DurationMicrosecondType,
    DurationMillisecondType, DurationNanosecondType, DurationSecondType, Float16Type, Float32Type,
    Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, IntervalDayTimeType,
    IntervalUnit, IntervalYearMonthType, Time32MillisecondType, Time32SecondType,
    Time64MicrosecondType, Time64NanosecondType, TimeUnit, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt8Type, UInt16Type,
    UInt32Type, UInt64Type,
};
use keyfold_result::{Error, Result};
use rustc_hash::FxHashMap;

use crate::driver::DriverCore;
use crate::state::AggState;
use crate::{AggFuncDef, Aggregator};

/// Structural group-key value for the generic specialization.
///
/// Equality and hashing are structural: strings and binaries by bytes,
/// decimals by unscaled integer plus scale, floats by bit pattern (so NaN
/// payloads and signed zeros key bit-exactly), and `Null` equal to `Null`,
/// which makes null key components group together.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ScalarKey {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(u64),
    Interval { days: i32, millis: i32 },
    Bytes(Vec<u8>),
    Decimal128 { unscaled: i128, scale: i8 },
    Decimal256 { words: [u8; 32], scale: i8 },
}

fn prim<T: ArrowPrimitiveType>(array: &ArrayRef) -> Result<&PrimitiveArray<T>> {
    array
        .as_any()
        .downcast_ref::<PrimitiveArray<T>>()
        .ok_or_else(|| Error::Internal("group key array representation mismatch".into()))
}

macro_rules! byte_key {
    ($array:expr, $row:expr, $array_ty:ty) => {{
        let typed = $array
            .as_any()
            .downcast_ref::<$array_ty>()
            .ok_or_else(|| Error::Internal("group key array representation mismatch".into()))?;
        ScalarKey::Bytes(AsRef::<[u8]>::as_ref(&typed.value($row)).to_vec())
    }};
}

fn scalar_key_at(array: &ArrayRef, row: usize) -> Result<ScalarKey> {
    if array.is_null(row) {
        return Ok(ScalarKey::Null);
    }
    Ok(match array.data_type() {
        DataType::Boolean => {
            let typed = array
                .as_any()
                .downcast_ref::<BooleanArray>()
                .ok_or_else(|| Error::Internal("group key array representation mismatch".into()))?;
            ScalarKey::Bool(typed.value(row))
        }
        DataType::Int8 => ScalarKey::Int(prim::<Int8Type>(array)?.value(row) as i64),
        DataType::Int16 => ScalarKey::Int(prim::<Int16Type>(array)?.value(row) as i64),
        DataType::Int32 => ScalarKey::Int(prim::<Int32Type>(array)?.value(row) as i64),
        DataType::Int64 => ScalarKey::Int(prim::<Int64Type>(array)?.value(row)),
        DataType::UInt8 => ScalarKey::UInt(prim::<UInt8Type>(array)?.value(row) as u64),
        DataType::UInt16 => ScalarKey::UInt(prim::<UInt16Type>(array)?.value(row) as u64),
        DataType::UInt32 => ScalarKey::UInt(prim::<UInt32Type>(array)?.value(row) as u64),
        DataType::UInt64 => ScalarKey::UInt(prim::<UInt64Type>(array)?.value(row)),
        DataType::Float16 => {
            ScalarKey::Float(prim::<Float16Type>(array)?.value(row).to_bits() as u64)
        }
        DataType::Float32 => {
            ScalarKey::Float(prim::<Float32Type>(array)?.value(row).to_bits() as u64)
        }
        DataType::Float64 => ScalarKey::Float(prim::<Float64Type>(array)?.value(row).to_bits()),
        DataType::Date32 => ScalarKey::Int(prim::<Date32Type>(array)?.value(row) as i64),
        DataType::Date64 => ScalarKey::Int(prim::<Date64Type>(array)?.value(row)),
        DataType::Time32(TimeUnit::Second) => {
            ScalarKey::Int(prim::<Time32SecondType>(array)?.value(row) as i64)
        }
        DataType::Time32(TimeUnit::Millisecond) => {
            ScalarKey::Int(prim::<Time32MillisecondType>(array)?.value(row) as i64)
        }
        DataType::Time64(TimeUnit::Microsecond) => {
            ScalarKey::Int(prim::<Time64MicrosecondType>(array)?.value(row))
        }
        DataType::Time64(TimeUnit::Nanosecond) => {
            ScalarKey::Int(prim::<Time64NanosecondType>(array)?.value(row))
        }
        DataType::Timestamp(TimeUnit::Second, _) => {
            ScalarKey::Int(prim::<TimestampSecondType>(array)?.value(row))
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            ScalarKey::Int(prim::<TimestampMillisecondType>(array)?.value(row))
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            ScalarKey::Int(prim::<TimestampMicrosecondType>(array)?.value(row))
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            ScalarKey::Int(prim::<TimestampNanosecondType>(array)?.value(row))
        }
        DataType::Duration(TimeUnit::Second) => {
            ScalarKey::Int(prim::<DurationSecondType>(array)?.value(row))
        }
        DataType::Duration(TimeUnit::Millisecond) => {
            ScalarKey::Int(prim::<DurationMillisecondType>(array)?.value(row))
        }
        DataType::Duration(TimeUnit::Microsecond) => {
            ScalarKey::Int(prim::<DurationMicrosecondType>(array)?.value(row))
        }
        DataType::Duration(TimeUnit::Nanosecond) => {
            ScalarKey::Int(prim::<DurationNanosecondType>(array)?.value(row))
        }
        DataType::Interval(IntervalUnit::YearMonth) => {
            ScalarKey::Int(prim::<IntervalYearMonthType>(array)?.value(row) as i64)
        }
        DataType::Interval(IntervalUnit::DayTime) => {
            let value = prim::<IntervalDayTimeType>(array)?.value(row);
            ScalarKey::Interval {
                days: value.days,
                millis: value.milliseconds,
            }
        }
        DataType::Utf8 => byte_key!(array, row, StringArray),
        DataType::LargeUtf8 => byte_key!(array, row, LargeStringArray),
        DataType::Binary => byte_key!(array, row, BinaryArray),
        DataType::LargeBinary => byte_key!(array, row, LargeBinaryArray),
        DataType::FixedSizeBinary(_) => byte_key!(array, row, FixedSizeBinaryArray),
        DataType::Decimal128(_, scale) => {
            let typed = array
                .as_any()
                .downcast_ref::<Decimal128Array>()
                .ok_or_else(|| Error::Internal("group key array representation mismatch".into()))?;
            ScalarKey::Decimal128 {
                unscaled: typed.value(row),
                scale: *scale,
            }
        }
        DataType::Decimal256(_, scale) => {
            let typed = array
                .as_any()
                .downcast_ref::<Decimal256Array>()
                .ok_or_else(|| Error::Internal("group key array representation mismatch".into()))?;
            ScalarKey::Decimal256 {
                words: typed.value(row).to_le_bytes(),
                scale: *scale,
            }
        }
        other => {
            return Err(Error::UnsupportedType(format!(
                "{other} group keys are not hashable"
            )));
        }
    })
}

/// Fallback hash aggregate: keys are vectors of [`ScalarKey`], extracted
/// positionally from the group-by columns. Slower than the numeric
/// specializations but defined for every scalar key type.
pub struct GenericHashAggregate {
    core: DriverCore,
    groups: FxHashMap<Vec<ScalarKey>, Vec<AggState>>,
    key_arrays: Vec<ArrayRef>,
}

impl GenericHashAggregate {
    pub fn new(
        groupby_cols: Vec<String>,
        key_project_cols: Vec<String>,
        agg_defs: Vec<AggFuncDef>,
    ) -> Self {
        Self {
            core: DriverCore::new(groupby_cols, key_project_cols, agg_defs),
            groups: FxHashMap::default(),
            key_arrays: Vec::new(),
        }
    }
}

impl Aggregator for GenericHashAggregate {
    fn next(&mut self, batch: &RecordBatch) -> Result<()> {
        let schema = batch.schema();
        self.core.ensure_init(schema.as_ref())?;
        self.core.bind_batch(batch)?;

        self.key_arrays.clear();
        for &col_idx in &self.core.groupby_indices {
            self.key_arrays.push(batch.column(col_idx).clone());
        }

        for row_idx in 0..batch.num_rows() {
            let mut key = Vec::with_capacity(self.key_arrays.len());
            for array in &self.key_arrays {
                key.push(scalar_key_at(array, row_idx)?);
            }

            let entry = self.groups.entry(key).or_default();
            if entry.is_empty() {
                self.core.init_entry(entry, row_idx)?;
            } else {
                self.core.update_entry(entry)?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<RecordBatch> {
        self.core.reserve(self.groups.len());
        let groups = std::mem::take(&mut self.groups);
        for entry in groups.values() {
            self.core.summarize_entry(entry)?;
        }
        self.core.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Float64Array;
    use std::sync::Arc;

    #[test]
    fn nulls_key_equal_across_rows() {
        let array: ArrayRef = Arc::new(StringArray::from(vec![None::<&str>, None]));
        let a = scalar_key_at(&array, 0).unwrap();
        let b = scalar_key_at(&array, 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn signed_zeros_key_differently() {
        let array: ArrayRef = Arc::new(Float64Array::from(vec![0.0f64, -0.0]));
        let positive = scalar_key_at(&array, 0).unwrap();
        let negative = scalar_key_at(&array, 1).unwrap();
        assert_ne!(positive, negative);
    }

    #[test]
    fn decimal_keys_carry_scale() {
        let array: ArrayRef = Arc::new(
            Decimal128Array::from(vec![10i128])
                .with_precision_and_scale(10, 1)
                .unwrap(),
        );
        assert_eq!(
            scalar_key_at(&array, 0).unwrap(),
            ScalarKey::Decimal128 {
                unscaled: 10,
                scale: 1
            }
        );
    }

    #[test]
    fn nested_keys_are_rejected() {
        use arrow::array::ListBuilder;
        let mut builder = ListBuilder::new(arrow::array::Int32Builder::new());
        builder.values().append_value(1);
        builder.append(true);
        let array: ArrayRef = Arc::new(builder.finish());
        assert!(scalar_key_at(&array, 0).is_err());
    }
}

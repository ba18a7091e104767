//! Construction of aggregate function states from `(kind, column type)`.

use arrow::datatypes::{DataType, IntervalUnit, Schema, TimeUnit};
use arrow::datatypes::{
    Date32Type, Date64Type, DurationMicrosecondType, DurationMillisecondType,
    DurationNanosecondType, DurationSecondType, Float16Type, Float32Type, Float64Type, Int8Type,
    Int16Type, Int32Type, Int64Type, IntervalDayTimeType, IntervalYearMonthType,
    Time32MillisecondType, Time32SecondType, Time64MicrosecondType, Time64NanosecondType,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use keyfold_result::{Error, Result};

use crate::funcs::AggFunc;
use crate::funcs::avg::{AvgFloatFunc, AvgIntFunc, AvgUIntFunc, AvgWideFunc};
use crate::funcs::count::{CountFunc, CountStarFunc};
use crate::funcs::group::{BoolGroupFunc, BytesGroupFunc, GroupBuilderFunc, OpaqueGroupFunc};
use crate::funcs::minmax::{BoolMinMaxFunc, BytesMinMaxFunc, MinMaxFunc};
use crate::funcs::sum::{SumFloatFunc, SumIntFunc, SumUIntFunc, SumWideFunc};
use crate::{AggFuncDef, AggFuncKind};

/// Build the function state for one aggregate definition against a schema.
///
/// Fails with [`Error::SchemaMismatch`] when the input column is missing and
/// with [`Error::UnsupportedType`] when the aggregation is not defined on
/// the column's type.
pub fn agg_func_for(def: &AggFuncDef, schema: &Schema) -> Result<Box<dyn AggFunc>> {
    let data_type = match &def.column {
        Some(name) => schema
            .field_with_name(name)
            .map_err(|_| Error::SchemaMismatch(name.clone()))?
            .data_type()
            .clone(),
        // COUNT(*) reads no values; it is bound to the first column only
        // for the row count.
        None => DataType::UInt64,
    };

    match def.kind {
        AggFuncKind::Count => Ok(Box::new(CountFunc::new())),
        AggFuncKind::CountStar => Ok(Box::new(CountStarFunc::new())),
        AggFuncKind::Min => min_max_for(false, data_type),
        AggFuncKind::Max => min_max_for(true, data_type),
        AggFuncKind::Sum => sum_for(data_type),
        AggFuncKind::Avg => avg_for(data_type),
        AggFuncKind::GroupBuilder => group_builder_for(data_type),
    }
}

fn min_max_for(is_max: bool, dt: DataType) -> Result<Box<dyn AggFunc>> {
    Ok(match dt {
        DataType::Boolean => Box::new(BoolMinMaxFunc::new(is_max)),
        DataType::Int8 => Box::new(MinMaxFunc::<Int8Type>::new(is_max, dt)),
        DataType::Int16 => Box::new(MinMaxFunc::<Int16Type>::new(is_max, dt)),
        DataType::Int32 => Box::new(MinMaxFunc::<Int32Type>::new(is_max, dt)),
        DataType::Int64 => Box::new(MinMaxFunc::<Int64Type>::new(is_max, dt)),
        DataType::UInt8 => Box::new(MinMaxFunc::<UInt8Type>::new(is_max, dt)),
        DataType::UInt16 => Box::new(MinMaxFunc::<UInt16Type>::new(is_max, dt)),
        DataType::UInt32 => Box::new(MinMaxFunc::<UInt32Type>::new(is_max, dt)),
        DataType::UInt64 => Box::new(MinMaxFunc::<UInt64Type>::new(is_max, dt)),
        DataType::Float16 => Box::new(MinMaxFunc::<Float16Type>::new(is_max, dt)),
        DataType::Float32 => Box::new(MinMaxFunc::<Float32Type>::new(is_max, dt)),
        DataType::Float64 => Box::new(MinMaxFunc::<Float64Type>::new(is_max, dt)),
        DataType::Date32 => Box::new(MinMaxFunc::<Date32Type>::new(is_max, dt)),
        DataType::Date64 => Box::new(MinMaxFunc::<Date64Type>::new(is_max, dt)),
        DataType::Time32(TimeUnit::Second) => {
            Box::new(MinMaxFunc::<Time32SecondType>::new(is_max, dt))
        }
        DataType::Time32(TimeUnit::Millisecond) => {
            Box::new(MinMaxFunc::<Time32MillisecondType>::new(is_max, dt))
        }
        DataType::Time64(TimeUnit::Microsecond) => {
            Box::new(MinMaxFunc::<Time64MicrosecondType>::new(is_max, dt))
        }
        DataType::Time64(TimeUnit::Nanosecond) => {
            Box::new(MinMaxFunc::<Time64NanosecondType>::new(is_max, dt))
        }
        DataType::Timestamp(TimeUnit::Second, _) => {
            Box::new(MinMaxFunc::<TimestampSecondType>::new(is_max, dt))
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            Box::new(MinMaxFunc::<TimestampMillisecondType>::new(is_max, dt))
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            Box::new(MinMaxFunc::<TimestampMicrosecondType>::new(is_max, dt))
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            Box::new(MinMaxFunc::<TimestampNanosecondType>::new(is_max, dt))
        }
        DataType::Duration(TimeUnit::Second) => {
            Box::new(MinMaxFunc::<DurationSecondType>::new(is_max, dt))
        }
        DataType::Duration(TimeUnit::Millisecond) => {
            Box::new(MinMaxFunc::<DurationMillisecondType>::new(is_max, dt))
        }
        DataType::Duration(TimeUnit::Microsecond) => {
            Box::new(MinMaxFunc::<DurationMicrosecondType>::new(is_max, dt))
        }
        DataType::Duration(TimeUnit::Nanosecond) => {
            Box::new(MinMaxFunc::<DurationNanosecondType>::new(is_max, dt))
        }
        DataType::Interval(IntervalUnit::YearMonth) => {
            Box::new(MinMaxFunc::<IntervalYearMonthType>::new(is_max, dt))
        }
        DataType::Interval(IntervalUnit::DayTime) => {
            Box::new(MinMaxFunc::<IntervalDayTimeType>::new(is_max, dt))
        }
        DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Binary
        | DataType::LargeBinary
        | DataType::FixedSizeBinary(_)
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => Box::new(BytesMinMaxFunc::new(is_max, dt)?),
        other => {
            return Err(Error::UnsupportedType(format!(
                "min()/max() is not supported for {other} columns"
            )));
        }
    })
}

fn sum_for(dt: DataType) -> Result<Box<dyn AggFunc>> {
    Ok(match dt {
        DataType::Int8 => Box::new(SumIntFunc::<Int8Type, Int64Type>::new(DataType::Int64)),
        DataType::Int16 => Box::new(SumIntFunc::<Int16Type, Int64Type>::new(DataType::Int64)),
        DataType::Int32 => Box::new(SumIntFunc::<Int32Type, Int64Type>::new(DataType::Int64)),
        DataType::Int64 => Box::new(SumWideFunc::<Int64Type, Int64Type>::new(DataType::Int64)),
        DataType::UInt8 => Box::new(SumUIntFunc::<UInt8Type>::new()),
        DataType::UInt16 => Box::new(SumUIntFunc::<UInt16Type>::new()),
        DataType::UInt32 => Box::new(SumUIntFunc::<UInt32Type>::new()),
        DataType::UInt64 => Box::new(SumWideFunc::<UInt64Type, UInt64Type>::new(DataType::UInt64)),
        DataType::Float16 => Box::new(SumFloatFunc::<Float16Type>::new()),
        DataType::Float32 => Box::new(SumFloatFunc::<Float32Type>::new()),
        DataType::Float64 => Box::new(SumFloatFunc::<Float64Type>::new()),
        DataType::Time32(TimeUnit::Second) => {
            Box::new(SumIntFunc::<Time32SecondType, Time32SecondType>::new(dt))
        }
        DataType::Time32(TimeUnit::Millisecond) => Box::new(SumIntFunc::<
            Time32MillisecondType,
            Time32MillisecondType,
        >::new(dt)),
        DataType::Time64(TimeUnit::Microsecond) => Box::new(SumIntFunc::<
            Time64MicrosecondType,
            Time64MicrosecondType,
        >::new(dt)),
        DataType::Time64(TimeUnit::Nanosecond) => Box::new(SumIntFunc::<
            Time64NanosecondType,
            Time64NanosecondType,
        >::new(dt)),
        DataType::Duration(TimeUnit::Second) => {
            Box::new(SumIntFunc::<DurationSecondType, DurationSecondType>::new(dt))
        }
        DataType::Duration(TimeUnit::Millisecond) => Box::new(SumIntFunc::<
            DurationMillisecondType,
            DurationMillisecondType,
        >::new(dt)),
        DataType::Duration(TimeUnit::Microsecond) => Box::new(SumIntFunc::<
            DurationMicrosecondType,
            DurationMicrosecondType,
        >::new(dt)),
        DataType::Duration(TimeUnit::Nanosecond) => Box::new(SumIntFunc::<
            DurationNanosecondType,
            DurationNanosecondType,
        >::new(dt)),
        other => {
            return Err(Error::UnsupportedType(format!(
                "sum() is not supported for {other} columns"
            )));
        }
    })
}

fn avg_for(dt: DataType) -> Result<Box<dyn AggFunc>> {
    Ok(match dt {
        DataType::Int8 => Box::new(AvgIntFunc::<Int8Type, Float32Type>::new()),
        DataType::Int16 => Box::new(AvgIntFunc::<Int16Type, Float32Type>::new()),
        DataType::Int32 => Box::new(AvgIntFunc::<Int32Type, Float64Type>::new()),
        DataType::Int64 => Box::new(AvgWideFunc::<Int64Type>::new()),
        DataType::UInt8 => Box::new(AvgUIntFunc::<UInt8Type, Float32Type>::new()),
        DataType::UInt16 => Box::new(AvgUIntFunc::<UInt16Type, Float32Type>::new()),
        DataType::UInt32 => Box::new(AvgUIntFunc::<UInt32Type, Float64Type>::new()),
        DataType::UInt64 => Box::new(AvgWideFunc::<UInt64Type>::new()),
        DataType::Float16 => Box::new(AvgFloatFunc::<Float16Type>::new()),
        DataType::Float32 => Box::new(AvgFloatFunc::<Float32Type>::new()),
        DataType::Float64 => Box::new(AvgFloatFunc::<Float64Type>::new()),
        DataType::Time32(TimeUnit::Second) => {
            Box::new(AvgIntFunc::<Time32SecondType, Float64Type>::new())
        }
        DataType::Time32(TimeUnit::Millisecond) => {
            Box::new(AvgIntFunc::<Time32MillisecondType, Float64Type>::new())
        }
        DataType::Time64(TimeUnit::Microsecond) => {
            Box::new(AvgIntFunc::<Time64MicrosecondType, Float64Type>::new())
        }
        DataType::Time64(TimeUnit::Nanosecond) => {
            Box::new(AvgIntFunc::<Time64NanosecondType, Float64Type>::new())
        }
        DataType::Duration(TimeUnit::Second) => {
            Box::new(AvgIntFunc::<DurationSecondType, Float64Type>::new())
        }
        DataType::Duration(TimeUnit::Millisecond) => {
            Box::new(AvgIntFunc::<DurationMillisecondType, Float64Type>::new())
        }
        DataType::Duration(TimeUnit::Microsecond) => {
            Box::new(AvgIntFunc::<DurationMicrosecondType, Float64Type>::new())
        }
        DataType::Duration(TimeUnit::Nanosecond) => {
            Box::new(AvgIntFunc::<DurationNanosecondType, Float64Type>::new())
        }
        other => {
            return Err(Error::UnsupportedType(format!(
                "avg() is not supported for {other} columns"
            )));
        }
    })
}

fn group_builder_for(dt: DataType) -> Result<Box<dyn AggFunc>> {
    Ok(match dt {
        DataType::Boolean => Box::new(BoolGroupFunc::new()),
        DataType::Int8 => Box::new(GroupBuilderFunc::<Int8Type>::new(dt)),
        DataType::Int16 => Box::new(GroupBuilderFunc::<Int16Type>::new(dt)),
        DataType::Int32 => Box::new(GroupBuilderFunc::<Int32Type>::new(dt)),
        DataType::Int64 => Box::new(GroupBuilderFunc::<Int64Type>::new(dt)),
        DataType::UInt8 => Box::new(GroupBuilderFunc::<UInt8Type>::new(dt)),
        DataType::UInt16 => Box::new(GroupBuilderFunc::<UInt16Type>::new(dt)),
        DataType::UInt32 => Box::new(GroupBuilderFunc::<UInt32Type>::new(dt)),
        DataType::UInt64 => Box::new(GroupBuilderFunc::<UInt64Type>::new(dt)),
        DataType::Float16 => Box::new(GroupBuilderFunc::<Float16Type>::new(dt)),
        DataType::Float32 => Box::new(GroupBuilderFunc::<Float32Type>::new(dt)),
        DataType::Float64 => Box::new(GroupBuilderFunc::<Float64Type>::new(dt)),
        DataType::Date32 => Box::new(GroupBuilderFunc::<Date32Type>::new(dt)),
        DataType::Date64 => Box::new(GroupBuilderFunc::<Date64Type>::new(dt)),
        DataType::Time32(TimeUnit::Second) => {
            Box::new(GroupBuilderFunc::<Time32SecondType>::new(dt))
        }
        DataType::Time32(TimeUnit::Millisecond) => {
            Box::new(GroupBuilderFunc::<Time32MillisecondType>::new(dt))
        }
        DataType::Time64(TimeUnit::Microsecond) => {
            Box::new(GroupBuilderFunc::<Time64MicrosecondType>::new(dt))
        }
        DataType::Time64(TimeUnit::Nanosecond) => {
            Box::new(GroupBuilderFunc::<Time64NanosecondType>::new(dt))
        }
        DataType::Timestamp(TimeUnit::Second, _) => {
            Box::new(GroupBuilderFunc::<TimestampSecondType>::new(dt))
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            Box::new(GroupBuilderFunc::<TimestampMillisecondType>::new(dt))
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            Box::new(GroupBuilderFunc::<TimestampMicrosecondType>::new(dt))
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            Box::new(GroupBuilderFunc::<TimestampNanosecondType>::new(dt))
        }
        DataType::Duration(TimeUnit::Second) => {
            Box::new(GroupBuilderFunc::<DurationSecondType>::new(dt))
        }
        DataType::Duration(TimeUnit::Millisecond) => {
            Box::new(GroupBuilderFunc::<DurationMillisecondType>::new(dt))
        }
        DataType::Duration(TimeUnit::Microsecond) => {
            Box::new(GroupBuilderFunc::<DurationMicrosecondType>::new(dt))
        }
        DataType::Duration(TimeUnit::Nanosecond) => {
            Box::new(GroupBuilderFunc::<DurationNanosecondType>::new(dt))
        }
        DataType::Interval(IntervalUnit::YearMonth) => {
            Box::new(GroupBuilderFunc::<IntervalYearMonthType>::new(dt))
        }
        DataType::Interval(IntervalUnit::DayTime) => {
            Box::new(GroupBuilderFunc::<IntervalDayTimeType>::new(dt))
        }
        DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Binary
        | DataType::LargeBinary
        | DataType::FixedSizeBinary(_)
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => Box::new(BytesGroupFunc::new(dt)?),
        // Nested and otherwise opaque columns project through one-row
        // slices; only the null bitmap is ever interpreted.
        other => Box::new(OpaqueGroupFunc::new(other)),
    })
}

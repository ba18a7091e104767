//! SUM/AVG over 64-bit integers at and past the representable boundary.

mod common;

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Decimal128Array, Float64Array, Int64Array, UInt64Array};
use arrow::datatypes::{DECIMAL128_MAX_PRECISION, DataType};
use common::{aggregate_and_sort, assert_f64_near, batch_of, init_tracing};
use keyfold_aggregate::{AggFuncDef, AggFuncKind, SingleNumericHashAggregate};

fn overflow_batch() -> arrow::array::RecordBatch {
    let id: ArrayRef = Arc::new(Int64Array::from(vec![1i64, 2, 1, 1, 2, 2, 1, 1]));
    let int_64: ArrayRef = Arc::new(Int64Array::from(vec![
        Some(9_223_372_036_854_775_807),
        Some(9_223_372_036_854_775_806),
        Some(9_223_372_036_854_775_805),
        Some(9_223_372_036_854_775_804),
        None,
        Some(9_223_372_036_854_775_802),
        None,
        Some(9_223_372_036_854_775_799),
    ]));
    let uint_64: ArrayRef = Arc::new(UInt64Array::from(vec![
        Some(18_446_744_073_709_551_615),
        Some(18_446_744_073_709_551_614),
        Some(18_446_744_073_709_551_613),
        Some(18_446_744_073_709_551_612),
        None,
        Some(18_446_744_073_709_551_610),
        None,
        Some(18_446_744_073_709_551_608),
    ]));
    batch_of(vec![("id", id), ("int_64", int_64), ("uint_64", uint_64)])
}

#[test]
fn sum_promotes_to_decimal128_on_overflow() {
    init_tracing();
    let mut agg = SingleNumericHashAggregate::new(
        vec!["id".into()],
        vec!["id".into()],
        vec![
            AggFuncDef::new(AggFuncKind::Sum, "int_64", "sum_int"),
            AggFuncDef::new(AggFuncKind::Sum, "uint_64", "sum_uint"),
            AggFuncDef::new(AggFuncKind::Avg, "int_64", "avg_int"),
            AggFuncDef::new(AggFuncKind::Avg, "uint_64", "avg_uint"),
        ],
    );
    let result = aggregate_and_sort(&mut agg, &overflow_batch(), &[0]);

    assert_eq!(result.num_rows(), 2);
    let decimal = DataType::Decimal128(DECIMAL128_MAX_PRECISION, 0);
    assert_eq!(result.column(1).data_type(), &decimal);
    assert_eq!(result.column(2).data_type(), &decimal);

    assert_eq!(
        column_values!(result, 1, Decimal128Array),
        vec![
            Some(36_893_488_147_419_103_215i128),
            Some(18_446_744_073_709_551_608i128)
        ]
    );
    assert_eq!(
        column_values!(result, 2, Decimal128Array),
        vec![
            Some(73_786_976_294_838_206_448i128),
            Some(36_893_488_147_419_103_224i128)
        ]
    );

    // AVG divides inside the wide accumulator and never overflows.
    assert_eq!(result.column(3).data_type(), &DataType::Float64);
    let avg_int = column_values!(result, 3, Float64Array);
    assert_f64_near(avg_int[0], Some(9.223372036854776e18));
    assert_f64_near(avg_int[1], Some(9.223372036854776e18));
    let avg_uint = column_values!(result, 4, Float64Array);
    assert_f64_near(avg_uint[0], Some(1.8446744073709552e19));
    assert_f64_near(avg_uint[1], Some(1.8446744073709552e19));
}

#[test]
fn in_range_groups_replay_exactly_after_promotion() {
    init_tracing();
    // Many in-range groups around one overflowing group: whichever order
    // the table enumerates, every previously-emitted integer sum must
    // survive the decimal rebuild bit-exactly, negative values included.
    let mut ids = Vec::new();
    let mut values = Vec::new();
    for group in 0..20i64 {
        ids.push(group);
        values.push(Some(group * 3 - 25));
    }
    // Group 20 overflows positive, group 21 stays a negative i64.
    ids.extend([20, 20, 21, 21]);
    values.extend([
        Some(i64::MAX),
        Some(i64::MAX),
        Some(-5),
        Some(-6),
    ]);

    let id: ArrayRef = Arc::new(Int64Array::from(ids));
    let v: ArrayRef = Arc::new(Int64Array::from(values));
    let input = batch_of(vec![("id", id), ("v", v)]);

    let mut agg = SingleNumericHashAggregate::new(
        vec!["id".into()],
        vec!["id".into()],
        vec![AggFuncDef::new(AggFuncKind::Sum, "v", "sum_v")],
    );
    let result = aggregate_and_sort(&mut agg, &input, &[0]);

    assert_eq!(
        result.column(1).data_type(),
        &DataType::Decimal128(DECIMAL128_MAX_PRECISION, 0)
    );
    let sums = column_values!(result, 1, Decimal128Array);
    for group in 0..20usize {
        assert_eq!(sums[group], Some((group as i128) * 3 - 25));
    }
    assert_eq!(sums[20], Some(2 * (i64::MAX as i128)));
    assert_eq!(sums[21], Some(-11));
}

#[test]
fn negative_sums_promote_in_both_directions() {
    init_tracing();
    let id: ArrayRef = Arc::new(Int64Array::from(vec![1i64, 1, 2, 2]));
    let v: ArrayRef = Arc::new(Int64Array::from(vec![
        Some(i64::MIN + 2),
        Some(-100),
        Some(7),
        Some(-3),
    ]));
    let input = batch_of(vec![("id", id), ("v", v)]);

    let mut agg = SingleNumericHashAggregate::new(
        vec!["id".into()],
        vec!["id".into()],
        vec![AggFuncDef::new(AggFuncKind::Sum, "v", "sum_v")],
    );
    let result = aggregate_and_sort(&mut agg, &input, &[0]);

    assert_eq!(
        result.column(1).data_type(),
        &DataType::Decimal128(DECIMAL128_MAX_PRECISION, 0)
    );
    assert_eq!(
        column_values!(result, 1, Decimal128Array),
        vec![Some((i64::MIN as i128) + 2 - 100), Some(4)]
    );
}

#[test]
fn null_groups_survive_promotion() {
    init_tracing();
    // One group sums only nulls, another overflows: the null must replay
    // as a decimal null.
    let id: ArrayRef = Arc::new(Int64Array::from(vec![1i64, 1, 2]));
    let v: ArrayRef = Arc::new(Int64Array::from(vec![
        Some(i64::MAX),
        Some(i64::MAX),
        None,
    ]));
    let input = batch_of(vec![("id", id), ("v", v)]);

    let mut agg = SingleNumericHashAggregate::new(
        vec!["id".into()],
        vec!["id".into()],
        vec![AggFuncDef::new(AggFuncKind::Sum, "v", "sum_v")],
    );
    let result = aggregate_and_sort(&mut agg, &input, &[0]);

    assert_eq!(
        result.column(1).data_type(),
        &DataType::Decimal128(DECIMAL128_MAX_PRECISION, 0)
    );
    assert_eq!(
        column_values!(result, 1, Decimal128Array),
        vec![Some(2 * (i64::MAX as i128)), None]
    );
}

#[test]
fn in_range_sums_keep_the_integer_type() {
    init_tracing();
    let id: ArrayRef = Arc::new(Int64Array::from(vec![1i64, 1, 2]));
    let v: ArrayRef = Arc::new(UInt64Array::from(vec![Some(1u64), Some(2), Some(u64::MAX)]));
    let input = batch_of(vec![("id", id), ("v", v)]);

    let mut agg = SingleNumericHashAggregate::new(
        vec!["id".into()],
        vec!["id".into()],
        vec![AggFuncDef::new(AggFuncKind::Sum, "v", "sum_v")],
    );
    let result = aggregate_and_sort(&mut agg, &input, &[0]);

    // u64::MAX alone still fits u64; no promotion happens.
    assert_eq!(result.column(1).data_type(), &DataType::UInt64);
    assert_eq!(
        column_values!(result, 1, UInt64Array),
        vec![Some(3), Some(u64::MAX)]
    );
}

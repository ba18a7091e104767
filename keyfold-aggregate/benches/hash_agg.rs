use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema};
use criterion::{Criterion, criterion_group, criterion_main};
use keyfold_aggregate::{
    AggFuncDef, AggFuncKind, Aggregator, MultiNumericHashAggregate, SingleNumericHashAggregate,
};

const ROWS: i64 = 65_536;
const GROUPS: i64 = 1_024;

fn bench_batch() -> RecordBatch {
    let key: ArrayRef = Arc::new(Int64Array::from_iter_values((0..ROWS).map(|i| i % GROUPS)));
    let key2: ArrayRef = Arc::new(Int64Array::from_iter_values((0..ROWS).map(|i| i % 7)));
    let value: ArrayRef =
        Arc::new(Float64Array::from_iter_values((0..ROWS).map(|i| i as f64 * 0.5)));
    let schema = Arc::new(Schema::new(vec![
        Field::new("k", DataType::Int64, true),
        Field::new("k2", DataType::Int64, true),
        Field::new("v", DataType::Float64, true),
    ]));
    RecordBatch::try_new(schema, vec![key, key2, value]).unwrap()
}

fn agg_defs() -> Vec<AggFuncDef> {
    vec![
        AggFuncDef::count_star("count"),
        AggFuncDef::new(AggFuncKind::Sum, "v", "sum_v"),
        AggFuncDef::new(AggFuncKind::Avg, "v", "avg_v"),
    ]
}

fn bench_single_numeric(c: &mut Criterion) {
    let batch = bench_batch();
    c.bench_function("single_numeric_64k_rows_1k_groups", |b| {
        b.iter(|| {
            let mut agg =
                SingleNumericHashAggregate::new(vec!["k".into()], vec!["k".into()], agg_defs());
            agg.next(&batch).unwrap();
            agg.finish().unwrap()
        })
    });
}

fn bench_multi_numeric(c: &mut Criterion) {
    let batch = bench_batch();
    c.bench_function("multi_numeric_64k_rows", |b| {
        b.iter(|| {
            let mut agg = MultiNumericHashAggregate::new(
                vec!["k".into(), "k2".into()],
                vec!["k".into(), "k2".into()],
                agg_defs(),
            );
            agg.next(&batch).unwrap();
            agg.finish().unwrap()
        })
    });
}

criterion_group!(benches, bench_single_numeric, bench_multi_numeric);
criterion_main!(benches);

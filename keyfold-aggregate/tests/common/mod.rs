//! Shared helpers for the aggregation scenario tests.

use std::sync::{Arc, Once};

use arrow::array::{Array, ArrayRef, RecordBatch};
use arrow::compute::{SortColumn, SortOptions, lexsort_to_indices, take};
use arrow::datatypes::{Field, Schema};
use keyfold_aggregate::Aggregator;

static INIT: Once = Once::new();

/// Initialize tracing for test binaries. Safe to call multiple times.
pub fn init_tracing() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    });
}

/// Build a record batch from named columns; every field is nullable.
pub fn batch_of(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let arrays: Vec<ArrayRef> = columns.into_iter().map(|(_, array)| array).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

/// Feed the batch through the aggregator split in two, then return the
/// result sorted on the given columns (hash enumeration order is not
/// guaranteed, so every comparison sorts first).
pub fn aggregate_and_sort(
    agg: &mut dyn Aggregator,
    input: &RecordBatch,
    sort_cols: &[usize],
) -> RecordBatch {
    let mid = input.num_rows() / 2;
    if mid > 0 {
        agg.next(&input.slice(0, mid)).unwrap();
        agg.next(&input.slice(mid, input.num_rows() - mid)).unwrap();
    } else {
        agg.next(input).unwrap();
    }
    sort_batch(&agg.finish().unwrap(), sort_cols)
}

/// Sort a batch ascending on the given column indices, nulls last.
pub fn sort_batch(batch: &RecordBatch, sort_cols: &[usize]) -> RecordBatch {
    if batch.num_rows() == 0 {
        return batch.clone();
    }
    let sort_columns: Vec<SortColumn> = sort_cols
        .iter()
        .map(|&idx| SortColumn {
            values: batch.column(idx).clone(),
            options: Some(SortOptions {
                descending: false,
                nulls_first: false,
            }),
        })
        .collect();
    let indices = lexsort_to_indices(&sort_columns, None).unwrap();
    let columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|column| take(column.as_ref(), &indices, None).unwrap())
        .collect();
    RecordBatch::try_new(batch.schema(), columns).unwrap()
}

/// Extract a typed column as options.
#[macro_export]
macro_rules! column_values {
    ($batch:expr, $idx:expr, $array_ty:ty) => {{
        let array = $batch
            .column($idx)
            .as_any()
            .downcast_ref::<$array_ty>()
            .unwrap_or_else(|| {
                panic!(
                    "column {} is {:?}, not {}",
                    $idx,
                    $batch.column($idx).data_type(),
                    stringify!($array_ty)
                )
            });
        (0..array.len())
            .map(|row| {
                if array.is_null(row) {
                    None
                } else {
                    Some(array.value(row))
                }
            })
            .collect::<Vec<_>>()
    }};
}

pub fn assert_f64_near(actual: Option<f64>, expected: Option<f64>) {
    match (actual, expected) {
        (None, None) => {}
        (Some(a), Some(e)) => {
            let scale = e.abs().max(1.0);
            assert!(
                (a - e).abs() <= scale * 1e-12,
                "expected {e}, got {a}"
            );
        }
        (a, e) => panic!("expected {e:?}, got {a:?}"),
    }
}

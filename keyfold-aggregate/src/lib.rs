//! Streaming, vectorized GROUP BY engine over Arrow record batches.
//!
//! The engine consumes an ordered sequence of [`RecordBatch`]es and emits a
//! single aggregated batch: one row per distinct group-key tuple, with the
//! projected key columns first and one column per requested aggregate
//! (COUNT, COUNT(*), MIN, MAX, SUM, AVG) after them.
//!
//! Four drivers implement the [`Aggregator`] trait, picked by key shape:
//! - [`OneGroupAggregate`] when there are no group-by columns;
//! - [`SingleNumericHashAggregate`] for exactly one primitive numeric key;
//! - [`MultiNumericHashAggregate`] when every key column is primitive
//!   numeric;
//! - [`GenericHashAggregate`] for any scalar key types.
//!
//! [`aggregate_for`] applies that policy top to bottom for callers that do
//! not pick a driver themselves.
//!
//! # Null semantics
//!
//! Aggregates skip null inputs (COUNT(*) counts rows). Null *keys* group
//! together: unlike SQL's `NULL <> NULL`, all rows with a null key component
//! in the same position fall into one group. Float keys compare by bit
//! pattern, so `-0.0` and `+0.0` form two groups and NaNs with different
//! payloads do too.
//!
//! # Output schema
//!
//! The output column for SUM over a 64-bit integer column is declared with
//! the input type but silently promotes to `decimal128(38, 0)` when any
//! group's sum leaves the input type's range. Consumers must introspect the
//! result column's type.
//!
//! Row order of the output is the hash table's enumeration order and is not
//! guaranteed; sort before comparing.
//!
//! Drivers are single-shot: after a successful [`Aggregator::finish`],
//! further calls are undefined.

pub mod driver;
pub mod funcs;
pub mod generic;
pub mod multi;
pub mod one_group;
pub mod single;
pub mod state;

pub use funcs::{AggFunc, agg_func_for};
pub use generic::GenericHashAggregate;
pub use multi::MultiNumericHashAggregate;
pub use one_group::OneGroupAggregate;
pub use single::SingleNumericHashAggregate;
pub use state::AggState;

use arrow::array::RecordBatch;
use arrow::datatypes::Schema;
use keyfold_cursor::is_numeric_key_type;
use keyfold_result::{Error, Result};

/// Aggregate reduction kinds.
///
/// `GroupBuilder` is internal: the driver synthesizes one per projected key
/// column to reproduce the group's first-seen key value in the output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggFuncKind {
    Count,
    CountStar,
    Min,
    Max,
    Sum,
    Avg,
    GroupBuilder,
}

/// One requested aggregation: what to compute, over which input column, and
/// the output column name. `column` is `None` only for COUNT(*).
#[derive(Clone, Debug)]
pub struct AggFuncDef {
    pub kind: AggFuncKind,
    pub column: Option<String>,
    pub out_column: String,
}

impl AggFuncDef {
    pub fn new(kind: AggFuncKind, column: impl Into<String>, out_column: impl Into<String>) -> Self {
        Self {
            kind,
            column: Some(column.into()),
            out_column: out_column.into(),
        }
    }

    pub fn count_star(out_column: impl Into<String>) -> Self {
        Self {
            kind: AggFuncKind::CountStar,
            column: None,
            out_column: out_column.into(),
        }
    }
}

/// Common surface of the four aggregation drivers.
pub trait Aggregator {
    /// Fold one batch into the group table. The first call resolves column
    /// indices against the batch schema and builds the function states.
    fn next(&mut self, batch: &RecordBatch) -> Result<()>;

    /// Summarize all groups into the output batch. Single-shot.
    fn finish(&mut self) -> Result<RecordBatch>;
}

/// Pick the grouping specialization for the given key columns, top to
/// bottom by first match: one-group, single-numeric, multi-numeric,
/// generic.
pub fn aggregate_for(
    groupby_cols: Vec<String>,
    key_project_cols: Vec<String>,
    agg_defs: Vec<AggFuncDef>,
    schema: &Schema,
) -> Result<Box<dyn Aggregator>> {
    if groupby_cols.is_empty() {
        return Ok(Box::new(OneGroupAggregate::new(agg_defs)));
    }

    let mut key_types = Vec::with_capacity(groupby_cols.len());
    for name in &groupby_cols {
        let field = schema
            .field_with_name(name)
            .map_err(|_| Error::SchemaMismatch(name.clone()))?;
        key_types.push(field.data_type());
    }

    if key_types.len() == 1 && is_numeric_key_type(key_types[0]) {
        return Ok(Box::new(SingleNumericHashAggregate::new(
            groupby_cols,
            key_project_cols,
            agg_defs,
        )));
    }
    if key_types.iter().copied().all(is_numeric_key_type) {
        return Ok(Box::new(MultiNumericHashAggregate::new(
            groupby_cols,
            key_project_cols,
            agg_defs,
        )));
    }
    Ok(Box::new(GenericHashAggregate::new(
        groupby_cols,
        key_project_cols,
        agg_defs,
    )))
}

//! Shared machinery of the aggregation drivers.
//!
//! `DriverCore` owns everything the four grouping specializations have in
//! common: the declared column names, the function table with its
//! synthesized group-key builders, per-batch binding, per-row entry
//! initialization and update, and final result assembly. The
//! specializations compose it and contribute only entry lookup and the
//! summarize walk.

use std::sync::Arc;

use arrow::array::{RecordBatch, RecordBatchOptions};
use arrow::datatypes::{Field, Schema};
use keyfold_result::{Error, Result};

use crate::funcs::{AggFunc, agg_func_for};
use crate::state::AggState;
use crate::{AggFuncDef, AggFuncKind};

pub(crate) struct DriverCore {
    groupby_cols: Vec<String>,
    project_cols: Vec<String>,
    user_specs: Vec<AggFuncDef>,
    specs: Vec<AggFuncDef>,
    pub(crate) funcs: Vec<Box<dyn AggFunc>>,
    pub(crate) groupby_indices: Vec<usize>,
    pub(crate) project_count: usize,
}

impl DriverCore {
    pub(crate) fn new(
        groupby_cols: Vec<String>,
        project_cols: Vec<String>,
        agg_defs: Vec<AggFuncDef>,
    ) -> Self {
        Self {
            groupby_cols,
            project_cols,
            user_specs: agg_defs,
            specs: Vec::new(),
            funcs: Vec::new(),
            groupby_indices: Vec::new(),
            project_count: 0,
        }
    }

    /// Resolve column indices and build the function table on first sight
    /// of a batch schema. Group-key builders are synthesized ahead of the
    /// user-declared functions, one per projected key column.
    pub(crate) fn ensure_init(&mut self, schema: &Schema) -> Result<()> {
        if !self.funcs.is_empty() {
            return Ok(());
        }

        self.groupby_indices = lookup_col_indices(&self.groupby_cols, schema)?;
        lookup_col_indices(&self.project_cols, schema)?;
        self.project_count = self.project_cols.len();

        let mut specs = Vec::with_capacity(self.project_cols.len() + self.user_specs.len());
        for name in &self.project_cols {
            specs.push(AggFuncDef {
                kind: AggFuncKind::GroupBuilder,
                column: Some(name.clone()),
                out_column: name.clone(),
            });
        }
        specs.extend(self.user_specs.iter().cloned());

        let mut funcs = Vec::with_capacity(specs.len());
        for spec in &specs {
            funcs.push(agg_func_for(spec, schema)?);
        }
        tracing::debug!(
            functions = funcs.len(),
            group_keys = self.groupby_indices.len(),
            "initialized aggregate function table"
        );
        self.specs = specs;
        self.funcs = funcs;
        Ok(())
    }

    /// Bind every function's cursor to its input column of the new batch.
    pub(crate) fn bind_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        if batch.num_columns() == 0 {
            return Err(Error::Internal(
                "aggregation over a record batch with no columns".into(),
            ));
        }
        for (spec, func) in self.specs.iter().zip(self.funcs.iter_mut()) {
            let array = match &spec.column {
                Some(name) => batch
                    .column_by_name(name)
                    .ok_or_else(|| Error::SchemaMismatch(name.clone()))?,
                None => batch.column(0),
            };
            func.bind(array)?;
        }
        Ok(())
    }

    /// Populate a fresh group entry from the row at the cursor positions.
    pub(crate) fn init_entry(&mut self, entry: &mut Vec<AggState>, row_idx: usize) -> Result<()> {
        entry.reserve(self.funcs.len());
        for func in self.funcs.iter_mut() {
            entry.push(func.init(row_idx)?);
        }
        Ok(())
    }

    /// Fold the current row into an existing entry. Group-key builders are
    /// frozen after first sight, so only functions past the projected key
    /// prefix are updated.
    pub(crate) fn update_entry(&mut self, entry: &mut [AggState]) -> Result<()> {
        let skip = self.project_count;
        for (func, state) in self.funcs[skip..]
            .iter_mut()
            .zip(entry[skip..].iter_mut())
        {
            func.update(state)?;
        }
        Ok(())
    }

    pub(crate) fn reserve(&mut self, groups: usize) {
        for func in self.funcs.iter_mut() {
            func.reserve(groups);
        }
    }

    pub(crate) fn summarize_entry(&mut self, entry: &[AggState]) -> Result<()> {
        for (func, state) in self.funcs.iter_mut().zip(entry.iter()) {
            func.summarize(state)?;
        }
        Ok(())
    }

    /// Assemble the output batch: one field per function, named by its
    /// output column, typed by whatever the function declares after
    /// summarizing (the wide SUM may have promoted to decimal128).
    pub(crate) fn finish(&mut self) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.funcs.len());
        let mut columns = Vec::with_capacity(self.funcs.len());
        for (spec, func) in self.specs.iter().zip(self.funcs.iter_mut()) {
            fields.push(Field::new(spec.out_column.clone(), func.data_type(), true));
            columns.push(func.result()?);
        }
        let num_rows = columns.first().map(|column| column.len()).unwrap_or(0);
        let schema = Arc::new(Schema::new(fields));
        let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
        RecordBatch::try_new_with_options(schema, columns, &options).map_err(Error::from)
    }
}

fn lookup_col_indices(col_names: &[String], schema: &Schema) -> Result<Vec<usize>> {
    col_names
        .iter()
        .map(|name| {
            schema
                .index_of(name)
                .map_err(|_| Error::SchemaMismatch(name.clone()))
        })
        .collect()
}

//! Hash aggregation specialized for one numeric group-by column.

use arrow::array::RecordBatch;
use keyfold_cursor::{KeyStream, key_stream_for};
use keyfold_result::{Error, Result};
use rustc_hash::FxHashMap;

use crate::driver::DriverCore;
use crate::state::AggState;
use crate::{AggFuncDef, Aggregator};

/// Hash aggregate keyed by the `u64` bit material of a single primitive
/// numeric column. Null key rows never enter the map; they collect in a
/// dedicated out-of-band entry, which summarizes last.
pub struct SingleNumericHashAggregate {
    core: DriverCore,
    groups: FxHashMap<u64, Vec<AggState>>,
    null_group: Option<Vec<AggState>>,
    key: Option<Box<dyn KeyStream>>,
}

impl SingleNumericHashAggregate {
    pub fn new(
        groupby_cols: Vec<String>,
        key_project_cols: Vec<String>,
        agg_defs: Vec<AggFuncDef>,
    ) -> Self {
        Self {
            core: DriverCore::new(groupby_cols, key_project_cols, agg_defs),
            groups: FxHashMap::default(),
            null_group: None,
            key: None,
        }
    }
}

impl Aggregator for SingleNumericHashAggregate {
    fn next(&mut self, batch: &RecordBatch) -> Result<()> {
        let schema = batch.schema();
        self.core.ensure_init(schema.as_ref())?;
        self.core.bind_batch(batch)?;

        let key_idx = match self.core.groupby_indices.as_slice() {
            &[idx] => idx,
            other => {
                return Err(Error::Internal(format!(
                    "single-key hash aggregate configured with {} group columns",
                    other.len()
                )));
            }
        };
        let key_col = batch.column(key_idx);
        if self.key.is_none() {
            self.key = Some(key_stream_for(key_col.data_type())?);
        }
        let key = match self.key.as_mut() {
            Some(key) => key,
            None => return Err(Error::Internal("missing group key stream".into())),
        };
        key.attach(key_col)?;

        for row_idx in 0..batch.num_rows() {
            // The null bit sits at the cursor position; read it before the
            // key material advances the cursor.
            let is_null = key.is_null();
            let key_bits = key.next_key_bits();

            let entry = if is_null {
                self.null_group.get_or_insert_with(Vec::new)
            } else {
                self.groups.entry(key_bits).or_default()
            };
            if entry.is_empty() {
                self.core.init_entry(entry, row_idx)?;
            } else {
                self.core.update_entry(entry)?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<RecordBatch> {
        let num_groups = self.groups.len() + usize::from(self.null_group.is_some());
        self.core.reserve(num_groups);

        let groups = std::mem::take(&mut self.groups);
        for entry in groups.values() {
            self.core.summarize_entry(entry)?;
        }
        if let Some(entry) = self.null_group.take() {
            self.core.summarize_entry(&entry)?;
        }
        self.core.finish()
    }
}

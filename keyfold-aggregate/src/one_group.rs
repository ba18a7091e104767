//! Global aggregation without grouping keys.

use arrow::array::RecordBatch;
use keyfold_result::Result;

use crate::driver::DriverCore;
use crate::state::AggState;
use crate::{AggFuncDef, Aggregator};

/// Degenerate aggregation path used when there are no group-by columns: a
/// single entry folds every batch through the batch-wise function entry
/// points. The result is always exactly one row once a batch has been seen,
/// even a zero-row one (COUNT(*) = 0, every other aggregate null).
pub struct OneGroupAggregate {
    core: DriverCore,
    entry: Vec<AggState>,
}

impl OneGroupAggregate {
    pub fn new(agg_defs: Vec<AggFuncDef>) -> Self {
        Self {
            core: DriverCore::new(Vec::new(), Vec::new(), agg_defs),
            entry: Vec::new(),
        }
    }
}

impl Aggregator for OneGroupAggregate {
    fn next(&mut self, batch: &RecordBatch) -> Result<()> {
        let schema = batch.schema();
        self.core.ensure_init(schema.as_ref())?;
        self.core.bind_batch(batch)?;

        if self.entry.is_empty() {
            for func in self.core.funcs.iter_mut() {
                self.entry.push(func.init_batch()?);
            }
        }

        for (func, state) in self.core.funcs.iter_mut().zip(self.entry.iter_mut()) {
            func.update_batch(state)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<RecordBatch> {
        self.core.reserve(1);
        if !self.entry.is_empty() {
            let entry = std::mem::take(&mut self.entry);
            self.core.summarize_entry(&entry)?;
        }
        self.core.finish()
    }
}

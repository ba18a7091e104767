//! Hash aggregation specialized for multiple numeric group-by columns.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use arrow::array::RecordBatch;
use keyfold_cursor::{KeyStream, key_stream_for};
use keyfold_result::Result;
use rustc_hash::FxHashMap;

use crate::driver::DriverCore;
use crate::state::AggState;
use crate::{AggFuncDef, Aggregator};

/// One component of a multi-column numeric key.
#[derive(Clone, Copy, Debug)]
pub(crate) struct KeyPart {
    pub(crate) bits: u64,
    pub(crate) is_null: bool,
}

impl PartialEq for KeyPart {
    fn eq(&self, other: &Self) -> bool {
        // Null components equal null components; the bit material of a null
        // row is whatever sat in the value buffer and must not participate.
        self.is_null == other.is_null && (self.is_null || self.bits == other.bits)
    }
}

impl Eq for KeyPart {}

/// Multi-column key with the combined hash fed to the map's hasher as one
/// word: per-element hashes (0 for nulls) fold into a seed through the
/// golden-ratio mix `seed ^= h + 0x9e3779b9 + (seed << 6) + (seed >> 2)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MultiKey(pub(crate) Vec<KeyPart>);

impl Hash for MultiKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut seed = self.0.len() as u64;
        for part in &self.0 {
            let h = if part.is_null {
                0
            } else {
                hash_u64(part.bits)
            };
            seed ^= h
                .wrapping_add(0x9e37_79b9)
                .wrapping_add(seed << 6)
                .wrapping_add(seed >> 2);
        }
        state.write_u64(seed);
    }
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hash aggregate keyed by a vector of `(u64, is_null)` pairs, one per
/// group-by column. All-null key tuples form a single group like any other
/// tuple; no out-of-band slot is needed.
pub struct MultiNumericHashAggregate {
    core: DriverCore,
    groups: FxHashMap<MultiKey, Vec<AggState>>,
    keys: Vec<Box<dyn KeyStream>>,
}

impl MultiNumericHashAggregate {
    pub fn new(
        groupby_cols: Vec<String>,
        key_project_cols: Vec<String>,
        agg_defs: Vec<AggFuncDef>,
    ) -> Self {
        Self {
            core: DriverCore::new(groupby_cols, key_project_cols, agg_defs),
            groups: FxHashMap::default(),
            keys: Vec::new(),
        }
    }
}

impl Aggregator for MultiNumericHashAggregate {
    fn next(&mut self, batch: &RecordBatch) -> Result<()> {
        let schema = batch.schema();
        self.core.ensure_init(schema.as_ref())?;
        self.core.bind_batch(batch)?;

        if self.keys.is_empty() {
            for &col_idx in &self.core.groupby_indices {
                self.keys
                    .push(key_stream_for(batch.column(col_idx).data_type())?);
            }
        }
        for (key, &col_idx) in self.keys.iter_mut().zip(&self.core.groupby_indices) {
            key.attach(batch.column(col_idx))?;
        }

        for row_idx in 0..batch.num_rows() {
            let mut parts = Vec::with_capacity(self.keys.len());
            for key in self.keys.iter_mut() {
                // The null bit must be read before the key material
                // advances the cursor past it.
                let is_null = key.is_null();
                parts.push(KeyPart {
                    bits: key.next_key_bits(),
                    is_null,
                });
            }

            let entry = self.groups.entry(MultiKey(parts)).or_default();
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

    fn hash_of(key: &MultiKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn null_parts_equal_regardless_of_bits() {
        let a = MultiKey(vec![
            KeyPart {
                bits: 17,
                is_null: true,
            },
            KeyPart {
                bits: 3,
                is_null: false,
            },
        ]);
        let b = MultiKey(vec![
            KeyPart {
                bits: 99,
                is_null: true,
            },
            KeyPart {
                bits: 3,
                is_null: false,
            },
        ]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn value_parts_distinguish_keys() {
        let a = MultiKey(vec![KeyPart {
            bits: 1,
            is_null: false,
        }]);
        let b = MultiKey(vec![KeyPart {
            bits: 2,
            is_null: false,
        }]);
        assert_ne!(a, b);
    }

    #[test]
    fn null_and_value_parts_differ() {
        let a = MultiKey(vec![KeyPart {
            bits: 0,
            is_null: true,
        }]);
        let b = MultiKey(vec![KeyPart {
            bits: 0,
            is_null: false,
        }]);
        assert_ne!(a, b);
    }
}

//! Aggregate function state objects.
//!
//! One boxed [`AggFunc`] instance exists per `(function, input column)`
//! pair. The driver hands each function its input column once per batch via
//! [`AggFunc::bind`]; the function owns the typed cursor over that column
//! and the builder its summarized output accumulates into.
//!
//! Row-wise protocol: `init(row_idx)` runs exactly once per row that opens a
//! new group and must consume that row from the cursor; `update` runs once
//! per row that hits an existing group. `init_batch`/`update_batch` back the
//! one-group path, which never inspects individual keys.

pub mod avg;
pub(crate) mod bytes;
pub mod count;
pub mod factory;
pub mod group;
pub mod minmax;
pub mod sum;

pub use factory::agg_func_for;

use arrow::array::ArrayRef;
use arrow::datatypes::DataType;
use half::f16;
use keyfold_result::Result;
use keyfold_wideint::Wide128;

use crate::state::AggState;

/// Capability surface of one aggregate function instance.
pub trait AggFunc {
    /// Bind the function's cursor to the current batch's input column.
    fn bind(&mut self, array: &ArrayRef) -> Result<()>;

    /// Produce the state for a freshly created group from the row at the
    /// cursor position, consuming that row.
    fn init(&mut self, row_idx: usize) -> Result<AggState>;

    /// Fold the row at the cursor position into an existing group's state,
    /// consuming that row.
    fn update(&mut self, state: &mut AggState) -> Result<()>;

    /// Produce the initial state for the one-group path.
    fn init_batch(&mut self) -> Result<AggState>;

    /// Fold every remaining row of the bound column into the state.
    fn update_batch(&mut self, state: &mut AggState) -> Result<()>;

    /// Pre-size the output builder for the expected number of groups.
    fn reserve(&mut self, capacity: usize);

    /// Append one group's summarized value to the output builder.
    fn summarize(&mut self, state: &AggState) -> Result<()>;

    /// Finish the output builder into the result column.
    fn result(&mut self) -> Result<ArrayRef>;

    /// Declared output type. May change between batches only for the wide
    /// SUM, whose output promotes to decimal128 on overflow.
    fn data_type(&self) -> DataType;
}

/// Widening of signed-integer-like natives into the `i64` accumulator.
pub(crate) trait WidenI64: Copy {
    fn widen(self) -> i64;
}

/// Widening of unsigned natives into the `u64` accumulator.
pub(crate) trait WidenU64: Copy {
    fn widen(self) -> u64;
}

/// Widening of float natives into the `f64` accumulator.
pub(crate) trait WidenF64: Copy {
    fn widen(self) -> f64;
}

/// Entry of a 64-bit integer native into the wide accumulator.
pub(crate) trait IntoWide: Copy {
    fn into_wide(self) -> Wide128;
    fn to_i128(self) -> i128;
}

macro_rules! impl_widen {
    ($trait_name:ident, $target:ty, $($t:ty),*) => {
        $(
            impl $trait_name for $t {
                #[inline]
                fn widen(self) -> $target {
                    self as $target
                }
            }
        )*
    };
}

impl_widen!(WidenI64, i64, i8, i16, i32, i64);
impl_widen!(WidenU64, u64, u8, u16, u32, u64);
impl_widen!(WidenF64, f64, f32, f64);

impl WidenF64 for f16 {
    #[inline]
    fn widen(self) -> f64 {
        f64::from(self)
    }
}

impl IntoWide for i64 {
    #[inline]
    fn into_wide(self) -> Wide128 {
        Wide128::from(self)
    }

    #[inline]
    fn to_i128(self) -> i128 {
        self as i128
    }
}

impl IntoWide for u64 {
    #[inline]
    fn into_wide(self) -> Wide128 {
        Wide128::from(self)
    }

    #[inline]
    fn to_i128(self) -> i128 {
        self as i128
    }
}

/// Narrowing from the `f64` division result into the AVG output native.
pub(crate) trait FromF64: Copy {
    fn from_f64(value: f64) -> Self;
}

impl FromF64 for f32 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl FromF64 for f64 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }
}

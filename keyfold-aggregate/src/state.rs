//! Per-group accumulator states.
//!
//! Each group entry holds one [`AggState`] per aggregate function. The enum
//! has one variant per accumulator *shape*, not per input type: every
//! fixed-width native widens losslessly into one of the slots (i8..i64 and
//! the date/time/duration natives into `Int`, unsigned into `UInt`, f16/f32
//! into `Float`), and the owning function narrows back when summarizing.
//! A function handed a variant it did not create reports an internal
//! invariant error instead of reinterpreting it.

use arrow::array::ArrayRef;
use arrow_buffer::IntervalDayTime;
use half::f16;
use keyfold_result::{Error, Result};
use keyfold_wideint::Wide128;

/// Accumulator state for one (group, function) pair.
#[derive(Debug, Clone)]
pub enum AggState {
    /// COUNT and COUNT(*).
    Count(u64),
    /// Signed-integer-like natives, widened.
    Int(Option<i64>),
    /// Unsigned natives, widened.
    UInt(Option<u64>),
    /// Float natives (f16/f32 widen losslessly) and float sums.
    Float(Option<f64>),
    /// Boolean values.
    Bool(Option<bool>),
    /// Day-time intervals.
    Interval(Option<IntervalDayTime>),
    /// Owned byte strings: string/binary/decimal MIN/MAX and key values.
    Bytes(Option<Vec<u8>>),
    /// Wide SUM accumulator for 64-bit integer columns.
    Wide(Option<Wide128>),
    /// AVG pair over a signed accumulator.
    AvgInt(Option<(i64, u64)>),
    /// AVG pair over an unsigned accumulator.
    AvgUInt(Option<(u64, u64)>),
    /// AVG pair over a float accumulator.
    AvgFloat(Option<(f64, u64)>),
    /// AVG pair over a wide accumulator.
    AvgWide(Option<(Wide128, u64)>),
    /// One-row slice of an opaque column, captured on first sight.
    Slice(Option<ArrayRef>),
}

pub(crate) fn state_mismatch(expected: &str, found: &AggState) -> Error {
    Error::Internal(format!(
        "aggregate state mismatch: expected {expected}, found {found:?}"
    ))
}

/// Mapping between a fixed-width native and its [`AggState`] slot.
///
/// `load(store(v)) == Some(v)` for every native that can appear in a column
/// of the corresponding type; the widening conversions are exact.
pub(crate) trait StateSlot: Copy {
    fn empty() -> AggState;
    fn store(value: Self) -> AggState;
    fn load(state: &AggState) -> Result<Option<Self>>;
}

macro_rules! impl_state_slot {
    ($native:ty, $variant:ident, |$v:ident| $to:expr, |$x:ident| $from:expr) => {
        impl StateSlot for $native {
            #[inline]
            fn empty() -> AggState {
                AggState::$variant(None)
            }

            #[inline]
            fn store($v: Self) -> AggState {
                AggState::$variant(Some($to))
            }

            #[inline]
            fn load(state: &AggState) -> Result<Option<Self>> {
                match state {
                    AggState::$variant(slot) => Ok(slot.map(|$x| $from)),
                    other => Err(state_mismatch(stringify!($variant), other)),
                }
            }
        }
    };
}

impl_state_slot!(i8, Int, |v| v as i64, |x| x as i8);
impl_state_slot!(i16, Int, |v| v as i64, |x| x as i16);
impl_state_slot!(i32, Int, |v| v as i64, |x| x as i32);
impl_state_slot!(i64, Int, |v| v, |x| x);
impl_state_slot!(u8, UInt, |v| v as u64, |x| x as u8);
impl_state_slot!(u16, UInt, |v| v as u64, |x| x as u16);
impl_state_slot!(u32, UInt, |v| v as u64, |x| x as u32);
impl_state_slot!(u64, UInt, |v| v, |x| x);
impl_state_slot!(f16, Float, |v| f64::from(v), |x| f16::from_f64(x));
impl_state_slot!(f32, Float, |v| v as f64, |x| x as f32);
impl_state_slot!(f64, Float, |v| v, |x| x);
impl_state_slot!(bool, Bool, |v| v, |x| x);
impl_state_slot!(IntervalDayTime, Interval, |v| v, |x| x);

/// Strict-order comparison for MIN/MAX over fixed-width natives.
///
/// Float comparisons use the native partial order, so a NaN never wins a
/// comparison and survives only as the first non-null value of its group.
pub(crate) trait NativeOrd {
    fn lt(&self, other: &Self) -> bool;
}

macro_rules! impl_native_ord {
    ($($t:ty),*) => {
        $(
            impl NativeOrd for $t {
                #[inline]
                fn lt(&self, other: &Self) -> bool {
                    self < other
                }
            }
        )*
    };
}

impl_native_ord!(i8, i16, i32, i64, u8, u16, u32, u64, f16, f32, f64, bool);

impl NativeOrd for IntervalDayTime {
    #[inline]
    fn lt(&self, other: &Self) -> bool {
        (self.days, self.milliseconds) < (other.days, other.milliseconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widened_natives_round_trip() {
        assert_eq!(i8::load(&i8::store(-7)).unwrap(), Some(-7));
        assert_eq!(u32::load(&u32::store(u32::MAX)).unwrap(), Some(u32::MAX));
        let half = f16::from_f64(1.5);
        assert_eq!(f16::load(&f16::store(half)).unwrap(), Some(half));
    }

    #[test]
    fn mismatched_variants_error() {
        assert!(i64::load(&AggState::Count(1)).is_err());
        assert!(u64::load(&AggState::Int(Some(1))).is_err());
    }

    #[test]
    fn interval_ordering_is_lexicographic_on_parts() {
        let small = IntervalDayTime::new(1, 500);
        let big = IntervalDayTime::new(2, 0);
        assert!(NativeOrd::lt(&small, &big));
        assert!(!NativeOrd::lt(&big, &small));
    }
}

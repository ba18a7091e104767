//! Signed 128-bit integer arithmetic for overflow-safe aggregation.
//!
//! [`Wide128`] is the intermediate accumulator for SUM and AVG over 64-bit
//! integer columns: the exact running sum can exceed 64 bits, so values are
//! widened on entry and only narrowed (or exported as decimal128) when the
//! result is summarized.
//!
//! The value is stored as two words, `{ lower: u64, upper: i64 }`, in
//! two's-complement. That shape feeds Arrow's `Decimal128` directly and keeps
//! the word-level contracts of the lineage implementation observable;
//! arithmetic itself routes through native `i128`.
//!
//! `i128::MIN` (`upper == i64::MIN`, `lower == 0`) is a sentinel and never a
//! valid `Wide128`: checked operations that would produce it report overflow.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Neg, Shl, Shr};

/// Signed 128-bit integer with checked arithmetic.
///
/// Comparison traits order by the upper word first, then the lower word,
/// which for any valid (non-sentinel) value matches signed 128-bit order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Wide128 {
    /// Low 64 bits of the two's-complement value.
    pub lower: u64,
    /// High 64 bits, carrying the sign.
    pub upper: i64,
}

impl Wide128 {
    pub const ZERO: Wide128 = Wide128 { lower: 0, upper: 0 };

    #[inline]
    pub fn new(upper: i64, lower: u64) -> Self {
        Wide128 { lower, upper }
    }

    #[inline]
    pub fn from_i128(value: i128) -> Self {
        Wide128 {
            lower: value as u64,
            upper: (value >> 64) as i64,
        }
    }

    #[inline]
    pub fn to_i128(self) -> i128 {
        ((self.upper as i128) << 64) | (self.lower as i128)
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.upper < 0
    }

    /// Checked addition. `None` when the sum leaves the valid range,
    /// including the `i128::MIN` sentinel.
    #[inline]
    pub fn checked_add(self, rhs: Wide128) -> Option<Wide128> {
        let sum = self.to_i128().checked_add(rhs.to_i128())?;
        if sum == i128::MIN {
            return None;
        }
        Some(Wide128::from_i128(sum))
    }

    /// Checked subtraction, symmetric to [`Wide128::checked_add`].
    #[inline]
    pub fn checked_sub(self, rhs: Wide128) -> Option<Wide128> {
        let diff = self.to_i128().checked_sub(rhs.to_i128())?;
        if diff == i128::MIN {
            return None;
        }
        Some(Wide128::from_i128(diff))
    }

    /// Checked multiplication. `None` when the product leaves the valid
    /// range, including the sentinel.
    #[inline]
    pub fn checked_mul(self, rhs: Wide128) -> Option<Wide128> {
        let product = self.to_i128().checked_mul(rhs.to_i128())?;
        if product == i128::MIN {
            return None;
        }
        Some(Wide128::from_i128(product))
    }

    /// Truncating division with remainder. The quotient truncates toward
    /// zero and the remainder takes the dividend's sign.
    ///
    /// Division by zero is a caller error.
    #[inline]
    pub fn div_rem(self, rhs: Wide128) -> (Wide128, Wide128) {
        debug_assert!(
            rhs.lower != 0 || rhs.upper != 0,
            "Wide128 division by zero"
        );
        let lhs = self.to_i128();
        let rhs = rhs.to_i128();
        (Wide128::from_i128(lhs / rhs), Wide128::from_i128(lhs % rhs))
    }

    /// Range-checked narrowing cast. `None` when the value is not
    /// representable in `T`; float targets always succeed (with rounding).
    #[inline]
    pub fn cast<T: FromWide>(self) -> Option<T> {
        T::from_wide(self)
    }
}

/// Conversion out of [`Wide128`] into a narrower representation.
pub trait FromWide: Sized {
    fn from_wide(value: Wide128) -> Option<Self>;
}

macro_rules! impl_from_wide_int {
    ($($t:ty),*) => {
        $(
            impl FromWide for $t {
                #[inline]
                fn from_wide(value: Wide128) -> Option<Self> {
                    <$t>::try_from(value.to_i128()).ok()
                }
            }
        )*
    };
}

impl_from_wide_int!(i8, i16, i32, i64, u64);

impl FromWide for f64 {
    #[inline]
    fn from_wide(value: Wide128) -> Option<Self> {
        Some(value.to_i128() as f64)
    }
}

impl FromWide for f32 {
    #[inline]
    fn from_wide(value: Wide128) -> Option<Self> {
        Some(value.to_i128() as f64 as f32)
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Wide128 {
                #[inline]
                fn from(value: $t) -> Self {
                    // Sign-extension into the upper word.
                    Wide128 {
                        lower: value as i64 as u64,
                        upper: if value < 0 { -1 } else { 0 },
                    }
                }
            }
        )*
    };
}

impl_from_signed!(i8, i16, i32, i64);

impl From<u64> for Wide128 {
    #[inline]
    fn from(value: u64) -> Self {
        Wide128 {
            lower: value,
            upper: 0,
        }
    }
}

impl Neg for Wide128 {
    type Output = Wide128;

    /// Word-level two's-complement negation: the lower word wraps through
    /// `2^64`, the upper word absorbs the carry.
    #[inline]
    fn neg(self) -> Wide128 {
        let lower = self.lower.wrapping_neg();
        let carry = (lower == 0) as i64;
        Wide128 {
            lower,
            upper: -1 - self.upper + carry,
        }
    }
}

impl Ord for Wide128 {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        match self.upper.cmp(&other.upper) {
            Ordering::Equal => self.lower.cmp(&other.lower),
            ordering => ordering,
        }
    }
}

impl PartialOrd for Wide128 {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Shr<u32> for Wide128 {
    type Output = Wide128;

    /// Unsigned-style right shift: negative values and shifts >= 128
    /// produce zero; the result never carries a set sign bit.
    fn shr(self, shift: u32) -> Wide128 {
        if self.upper < 0 || shift >= 128 {
            return Wide128::ZERO;
        }
        match shift {
            0 => self,
            64 => Wide128 {
                lower: self.upper as u64,
                upper: 0,
            },
            s if s < 64 => Wide128 {
                lower: ((self.upper as u64) << (64 - s)) | (self.lower >> s),
                upper: ((self.upper as u64) >> s) as i64,
            },
            s => Wide128 {
                lower: (self.upper as u64) >> (s - 64),
                upper: 0,
            },
        }
    }
}

impl Shl<u32> for Wide128 {
    type Output = Wide128;

    /// Unsigned-style left shift: negative values and shifts >= 128 produce
    /// zero; bits shifted into the sign position are masked off.
    fn shl(self, shift: u32) -> Wide128 {
        if self.upper < 0 || shift >= 128 {
            return Wide128::ZERO;
        }
        match shift {
            0 => self,
            64 => Wide128 {
                lower: 0,
                upper: self.lower as i64,
            },
            s if s < 64 => Wide128 {
                lower: self.lower << s,
                upper: ((((self.upper as u64) << s) | (self.lower >> (64 - s)))
                    & 0x7FFF_FFFF_FFFF_FFFF) as i64,
            },
            s => Wide128 {
                lower: 0,
                upper: ((self.lower << (s - 64)) & 0x7FFF_FFFF_FFFF_FFFF) as i64,
            },
        }
    }
}

impl fmt::Display for Wide128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_i128())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_round_trip() {
        for v in [0i64, 1, -1, 42, -42, i64::MAX, i64::MIN] {
            let wide = Wide128::from(v);
            assert_eq!(wide.cast::<i64>(), Some(v));
            assert_eq!(wide.to_i128(), v as i128);
        }
    }

    #[test]
    fn unsigned_round_trip() {
        for v in [0u64, 1, u64::MAX, u64::MAX - 7, 1 << 63] {
            let wide = Wide128::from(v);
            assert_eq!(wide.cast::<u64>(), Some(v));
            assert_eq!(wide.upper, 0);
        }
    }

    #[test]
    fn sign_extension_sets_upper_word() {
        let wide = Wide128::from(-1i8);
        assert_eq!(wide.lower, u64::MAX);
        assert_eq!(wide.upper, -1);
        assert_eq!(wide.cast::<i8>(), Some(-1));
    }

    #[test]
    fn narrowing_casts_check_range() {
        assert_eq!(Wide128::from(300i64).cast::<i8>(), None);
        assert_eq!(Wide128::from(127i64).cast::<i8>(), Some(127));
        assert_eq!(Wide128::from(-129i64).cast::<i8>(), None);
        assert_eq!(Wide128::from(-1i64).cast::<u64>(), None);
        let beyond_i64 = Wide128::from(i64::MAX)
            .checked_add(Wide128::from(1i64))
            .unwrap();
        assert_eq!(beyond_i64.cast::<i64>(), None);
        assert_eq!(beyond_i64.cast::<u64>(), Some(9_223_372_036_854_775_808));
    }

    #[test]
    fn float_casts_always_succeed() {
        let big = Wide128::from_i128(i128::MAX);
        assert_eq!(big.cast::<f64>(), Some(i128::MAX as f64));
        assert_eq!(Wide128::from(-3i64).cast::<f32>(), Some(-3.0));
    }

    #[test]
    fn addition_accumulates_past_u64() {
        let mut acc = Wide128::ZERO;
        for _ in 0..4 {
            acc = acc.checked_add(Wide128::from(u64::MAX)).unwrap();
        }
        assert_eq!(acc.to_string(), "73786976294838206460");
        assert_eq!(acc.cast::<u64>(), None);
    }

    #[test]
    fn add_overflow_at_i128_bounds() {
        let max = Wide128::from_i128(i128::MAX);
        assert!(max.checked_add(Wide128::from(1i64)).is_none());
        assert!(max.checked_add(Wide128::from(-1i64)).is_some());
    }

    #[test]
    fn sentinel_is_rejected() {
        let near_min = Wide128::from_i128(i128::MIN + 1);
        assert!(near_min.checked_add(Wide128::from(-1i64)).is_none());
        assert!(near_min.checked_sub(Wide128::from(1i64)).is_none());
    }

    #[test]
    fn mul_overflow() {
        let big = Wide128::from_i128(1i128 << 100);
        assert!(big.checked_mul(Wide128::from_i128(1i128 << 30)).is_none());
        assert_eq!(
            Wide128::from(1i64 << 40).checked_mul(Wide128::from(1i64 << 40)),
            Some(Wide128::from_i128(1i128 << 80))
        );
    }

    #[test]
    fn div_rem_truncates_toward_zero() {
        let (q, r) = Wide128::from(-7i64).div_rem(Wide128::from(2i64));
        assert_eq!(q.to_i128(), -3);
        assert_eq!(r.to_i128(), -1);
        let (q, r) = Wide128::from(7i64).div_rem(Wide128::from(-2i64));
        assert_eq!(q.to_i128(), -3);
        assert_eq!(r.to_i128(), 1);
    }

    #[test]
    fn negation_word_formula() {
        let v = Wide128::from(5i64);
        assert_eq!((-v).to_i128(), -5);
        assert_eq!((-(-v)).to_i128(), 5);
        let zero = -Wide128::ZERO;
        assert_eq!(zero, Wide128::ZERO);
        let wrap = -Wide128::from(u64::MAX);
        assert_eq!(wrap.to_i128(), -(u64::MAX as i128));
    }

    #[test]
    fn ordering_by_upper_then_lower() {
        let neg = Wide128::from(-1i64);
        let small = Wide128::from(1i64);
        let big = Wide128::from(u64::MAX);
        assert!(neg < small);
        assert!(small < big);
        assert!(big < Wide128::from_i128(1i128 << 64));
    }

    #[test]
    fn display_renders_decimal() {
        assert_eq!(Wide128::ZERO.to_string(), "0");
        assert_eq!(Wide128::from(-42i64).to_string(), "-42");
        assert_eq!(
            Wide128::from_i128(36_893_488_147_419_103_215).to_string(),
            "36893488147419103215"
        );
    }

    #[test]
    fn shifts_are_unsigned_style() {
        let one = Wide128::from(1i64);
        assert_eq!((one << 64), Wide128::new(1, 0));
        assert_eq!((one << 64) >> 64, one);
        // Bits shifted into the sign position are dropped.
        assert_eq!((one << 127), Wide128::ZERO);
        // Negative inputs shift to zero.
        assert_eq!((Wide128::from(-8i64) >> 1), Wide128::ZERO);
        assert_eq!((one << 128), Wide128::ZERO);
        assert_eq!((one << 0), one);
    }
}

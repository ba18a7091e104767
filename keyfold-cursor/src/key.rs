//! Group-key material for the numeric hash-aggregate specializations.
//!
//! Every numeric-keyed column value maps onto a `u64` bit pattern: signed
//! integers sign-extend, unsigned integers zero-extend, and floats
//! reinterpret their bits. Bit-pattern keys make group equality bit-exact:
//! `-0.0` and `+0.0` land in different groups, and NaNs with different
//! payloads do too. Null rows are routed out-of-band by the caller, so the
//! key material of a null row is never inspected.

use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, IntervalUnit};
use half::f16;
use keyfold_result::{Error, Result};

use crate::{BooleanCursor, Cursor, PrimitiveCursor};

/// Conversion of a native value into `u64` hash-key material.
pub trait KeyBits: Copy {
    fn key_bits(self) -> u64;
}

macro_rules! impl_key_bits_signed {
    ($($t:ty),*) => {
        $(
            impl KeyBits for $t {
                #[inline]
                fn key_bits(self) -> u64 {
                    // Sign-extends, so negative values of every width share
                    // one bit pattern.
                    self as i64 as u64
                }
            }
        )*
    };
}

macro_rules! impl_key_bits_unsigned {
    ($($t:ty),*) => {
        $(
            impl KeyBits for $t {
                #[inline]
                fn key_bits(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

impl_key_bits_signed!(i8, i16, i32, i64);
impl_key_bits_unsigned!(u8, u16, u32, u64);

impl KeyBits for f16 {
    #[inline]
    fn key_bits(self) -> u64 {
        self.to_bits() as u64
    }
}

impl KeyBits for f32 {
    #[inline]
    fn key_bits(self) -> u64 {
        self.to_bits() as u64
    }
}

impl KeyBits for f64 {
    #[inline]
    fn key_bits(self) -> u64 {
        self.to_bits()
    }
}

/// Streaming access to one group-key column.
///
/// The null bit sits at the cursor position and `next_key_bits` advances,
/// so callers must read `is_null` before consuming the key material.
pub trait KeyStream {
    fn attach(&mut self, array: &ArrayRef) -> Result<()>;
    fn is_null(&self) -> bool;
    fn next_key_bits(&mut self) -> u64;
}

impl<T> KeyStream for PrimitiveCursor<T>
where
    T: arrow::datatypes::ArrowPrimitiveType,
    T::Native: KeyBits,
{
    fn attach(&mut self, array: &ArrayRef) -> Result<()> {
        Cursor::attach(self, array)
    }

    fn is_null(&self) -> bool {
        Cursor::is_null(self)
    }

    fn next_key_bits(&mut self) -> u64 {
        self.next_value().key_bits()
    }
}

impl KeyStream for BooleanCursor {
    fn attach(&mut self, array: &ArrayRef) -> Result<()> {
        Cursor::attach(self, array)
    }

    fn is_null(&self) -> bool {
        Cursor::is_null(self)
    }

    fn next_key_bits(&mut self) -> u64 {
        self.next_value() as u64
    }
}

/// Whether a column of this type can key the numeric hash specializations.
pub fn is_numeric_key_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Date32
            | DataType::Date64
            | DataType::Time32(_)
            | DataType::Time64(_)
            | DataType::Timestamp(_, _)
            | DataType::Duration(_)
            | DataType::Interval(IntervalUnit::YearMonth)
    )
}

/// Build a detached key stream for a numeric-keyed column type.
pub fn key_stream_for(data_type: &DataType) -> Result<Box<dyn KeyStream>> {
    use arrow::datatypes::*;

    Ok(match data_type {
        DataType::Boolean => Box::new(BooleanCursor::new()),
        DataType::Int8 => Box::new(PrimitiveCursor::<Int8Type>::new()),
        DataType::Int16 => Box::new(PrimitiveCursor::<Int16Type>::new()),
        DataType::Int32 => Box::new(PrimitiveCursor::<Int32Type>::new()),
        DataType::Int64 => Box::new(PrimitiveCursor::<Int64Type>::new()),
        DataType::UInt8 => Box::new(PrimitiveCursor::<UInt8Type>::new()),
        DataType::UInt16 => Box::new(PrimitiveCursor::<UInt16Type>::new()),
        DataType::UInt32 => Box::new(PrimitiveCursor::<UInt32Type>::new()),
        DataType::UInt64 => Box::new(PrimitiveCursor::<UInt64Type>::new()),
        DataType::Float16 => Box::new(PrimitiveCursor::<Float16Type>::new()),
        DataType::Float32 => Box::new(PrimitiveCursor::<Float32Type>::new()),
        DataType::Float64 => Box::new(PrimitiveCursor::<Float64Type>::new()),
        DataType::Date32 => Box::new(PrimitiveCursor::<Date32Type>::new()),
        DataType::Date64 => Box::new(PrimitiveCursor::<Date64Type>::new()),
        DataType::Time32(TimeUnit::Second) => {
            Box::new(PrimitiveCursor::<Time32SecondType>::new())
        }
        DataType::Time32(TimeUnit::Millisecond) => {
            Box::new(PrimitiveCursor::<Time32MillisecondType>::new())
        }
        DataType::Time64(TimeUnit::Microsecond) => {
            Box::new(PrimitiveCursor::<Time64MicrosecondType>::new())
        }
        DataType::Time64(TimeUnit::Nanosecond) => {
            Box::new(PrimitiveCursor::<Time64NanosecondType>::new())
        }
        DataType::Timestamp(TimeUnit::Second, _) => {
            Box::new(PrimitiveCursor::<TimestampSecondType>::new())
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            Box::new(PrimitiveCursor::<TimestampMillisecondType>::new())
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            Box::new(PrimitiveCursor::<TimestampMicrosecondType>::new())
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            Box::new(PrimitiveCursor::<TimestampNanosecondType>::new())
        }
        DataType::Duration(TimeUnit::Second) => {
            Box::new(PrimitiveCursor::<DurationSecondType>::new())
        }
        DataType::Duration(TimeUnit::Millisecond) => {
            Box::new(PrimitiveCursor::<DurationMillisecondType>::new())
        }
        DataType::Duration(TimeUnit::Microsecond) => {
            Box::new(PrimitiveCursor::<DurationMicrosecondType>::new())
        }
        DataType::Duration(TimeUnit::Nanosecond) => {
            Box::new(PrimitiveCursor::<DurationNanosecondType>::new())
        }
        DataType::Interval(IntervalUnit::YearMonth) => {
            Box::new(PrimitiveCursor::<IntervalYearMonthType>::new())
        }
        other => {
            return Err(Error::UnsupportedType(format!(
                "{other} cannot key a numeric hash aggregate"
            )));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int8Array};
    use std::sync::Arc;

    #[test]
    fn signed_keys_sign_extend() {
        let array: ArrayRef = Arc::new(Int8Array::from(vec![-1i8, 1]));
        let mut stream = key_stream_for(&DataType::Int8).unwrap();
        stream.attach(&array).unwrap();
        assert_eq!(stream.next_key_bits(), u64::MAX);
        assert_eq!(stream.next_key_bits(), 1);
    }

    #[test]
    fn float_keys_are_bit_patterns() {
        let array: ArrayRef = Arc::new(Float64Array::from(vec![0.0f64, -0.0]));
        let mut stream = key_stream_for(&DataType::Float64).unwrap();
        stream.attach(&array).unwrap();
        let positive = stream.next_key_bits();
        let negative = stream.next_key_bits();
        assert_ne!(positive, negative);
    }

    #[test]
    fn null_bit_is_read_at_the_cursor_position() {
        let array: ArrayRef = Arc::new(Int8Array::from(vec![Some(1), None]));
        let mut stream = key_stream_for(&DataType::Int8).unwrap();
        stream.attach(&array).unwrap();
        assert!(!stream.is_null());
        stream.next_key_bits();
        assert!(stream.is_null());
    }

    #[test]
    fn non_numeric_types_are_rejected() {
        assert!(key_stream_for(&DataType::Utf8).is_err());
        assert!(!is_numeric_key_type(&DataType::Utf8));
        assert!(is_numeric_key_type(&DataType::Boolean));
    }
}

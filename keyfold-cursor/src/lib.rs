//! Typed, null-aware cursors over single Arrow arrays.
//!
//! A cursor walks one array of known physical type in row order, answering
//! at each position whether the row is null and, for typed cursors, what the
//! value is. Cursors are the per-column read path of the aggregation engine:
//! each aggregate function owns the cursor matching its input column, and
//! the hash specializations read group-key material through [`KeyStream`].
//!
//! Cursor kinds:
//! - [`PrimitiveCursor`] for fixed-width primitives (integers, floats,
//!   dates, times, timestamps, durations, intervals);
//! - [`BooleanCursor`] for the boolean bitmap representation;
//! - [`BytesCursor`] for variable-length and byte-view columns (strings,
//!   binaries, fixed-size binary, decimals);
//! - [`OpaqueCursor`] for nested or otherwise opaque columns, which support
//!   only the null-query surface.
//!
//! Cursors are created detached (bound to an empty array of the right type)
//! and re-attached to each incoming batch's column via [`Cursor::attach`].

pub mod bytes;
pub mod key;
pub mod primitive;

pub use bytes::BytesCursor;
pub use key::{KeyBits, KeyStream, is_numeric_key_type, key_stream_for};
pub use primitive::{BooleanCursor, OpaqueCursor, PrimitiveCursor};

use arrow::array::ArrayRef;
use arrow::datatypes::DataType;
use keyfold_result::Result;

/// Null-query surface shared by every cursor kind.
///
/// The cursor position advances through [`Cursor::next_null`],
/// [`Cursor::next_if_null`], or the typed `next_*` methods of the concrete
/// cursors; mixing positional (`*_at`) and streaming access is allowed.
pub trait Cursor {
    /// Bind the cursor to a new array and reset the position to row zero.
    ///
    /// Fails when the array's physical representation does not match the
    /// cursor's type.
    fn attach(&mut self, array: &ArrayRef) -> Result<()>;

    /// Number of rows in the attached array.
    fn len(&self) -> usize;

    /// Whether the cursor position is still inside the array.
    fn has_more(&self) -> bool;

    /// Number of non-null rows in the attached array.
    fn non_null_count(&self) -> usize;

    /// Whether the row at the cursor position is null. Returns `false` when
    /// the cursor is exhausted.
    fn is_null(&self) -> bool;

    /// Whether the row at an arbitrary index is null.
    fn is_null_at(&self, idx: usize) -> bool;

    /// Advance the position by one row without reading a value.
    fn advance(&mut self);

    /// Report the null bit at the position and advance.
    fn next_null(&mut self) -> bool {
        let is_null = self.is_null();
        self.advance();
        is_null
    }

    /// Report the null bit at the position; advance only when it is set.
    fn next_if_null(&mut self) -> bool {
        let is_null = self.is_null();
        if is_null {
            self.advance();
        }
        is_null
    }
}

/// Build a detached cursor for the given physical type.
///
/// Every recognized type id resolves to a cursor; nested and otherwise
/// opaque types resolve to an [`OpaqueCursor`] that supports only null
/// queries.
pub fn cursor_for(data_type: &DataType) -> Result<Box<dyn Cursor>> {
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
        DataType::Interval(IntervalUnit::DayTime) => {
            Box::new(PrimitiveCursor::<IntervalDayTimeType>::new())
        }
        DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Binary
        | DataType::LargeBinary
        | DataType::FixedSizeBinary(_)
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => Box::new(BytesCursor::new(data_type)?),
        other => Box::new(OpaqueCursor::new(other)),
    })
}

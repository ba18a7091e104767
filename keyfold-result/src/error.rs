use thiserror::Error;

/// Unified error type for all keyfold operations.
///
/// This enum encompasses the failure modes of the aggregation stack, from
/// cursor construction to final result assembly. Each variant includes
/// context-specific information to help diagnose and handle the error
/// appropriately.
///
/// # Error Handling Strategy
///
/// Errors propagate upward through the call stack using Rust's `?` operator.
/// Every error is fatal to the aggregation instance that raised it: there is
/// no partial-state recovery, and no partial result is emitted.
#[derive(Error, Debug)]
pub enum Error {
    /// Arrow library error during columnar data operations.
    ///
    /// This error occurs when:
    /// - Building Arrow arrays with invalid data
    /// - Assembling the output record batch
    /// - Schema mismatches inside batch construction
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// A named column was not found in the batch schema.
    ///
    /// Surfaced from `next` when resolving group-by, key-projection, or
    /// aggregate input columns by name. The message carries the offending
    /// column name.
    ///
    /// # Recovery
    ///
    /// These errors are recoverable at the caller level: fix the column
    /// reference and build a new aggregation instance.
    #[error("column not found in batch schema: {0}")]
    SchemaMismatch(String),

    /// The requested aggregation is not defined on the column's type.
    ///
    /// Examples: SUM over a boolean column, AVG over a string column, or a
    /// numeric-key hash specialization handed a non-numeric key column.
    /// Surfaced on the first `next` call, when function states are built.
    #[error("unsupported column type: {0}")]
    UnsupportedType(String),

    /// Checked accumulator arithmetic overflowed.
    ///
    /// Reachable from wide-integer multiplication and from the widened
    /// integer accumulators of SUM/AVG over small integer columns. Note that
    /// SUM over 64-bit integers does NOT raise this: it promotes the output
    /// column to decimal128 instead.
    #[error("numeric overflow: {0}")]
    Overflow(String),

    /// Internal error indicating a bug or unexpected state.
    ///
    /// This error should never occur during normal operation. It indicates
    /// violated internal invariants, such as `update` being called on a
    /// group-key builder, or a function handed an accumulator state variant
    /// it did not create.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

//! Error types and result definitions for the keyfold aggregation engine.
//!
//! The crate provides a unified error type ([`Error`]) and result type alias
//! ([`Result<T>`]) used throughout all keyfold crates. All operations that
//! could fail return `Result<T>`, where the error variant contains detailed
//! information about what went wrong.
//!
//! # Error Philosophy
//!
//! Keyfold uses a single error enum ([`Error`]) rather than crate-specific
//! error types. This approach:
//! - Simplifies error handling across crate boundaries
//! - Allows errors to propagate naturally with the `?` operator
//! - Enables structured error matching for programmatic handling
//!
//! # Error Categories
//!
//! - **Data format errors** ([`Error::Arrow`]): Arrow array and batch issues
//! - **Lookup failures** ([`Error::SchemaMismatch`]): Missing columns
//! - **Type errors** ([`Error::UnsupportedType`]): Aggregation undefined on a type
//! - **Arithmetic errors** ([`Error::Overflow`]): Checked accumulator overflow
//! - **Internal errors** ([`Error::Internal`]): Bugs or unexpected states

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;

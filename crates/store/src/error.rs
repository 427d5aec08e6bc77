//! Store error types
//!
//! `DataError` covers precondition violations on individual operations;
//! it never terminates a connection and never corrupts store state.
//! `ConfigError` is construction-time only.

use pulse_protocol::{DataType, ProtocolError};
use thiserror::Error;

/// A store operation failed its precondition
#[derive(Debug, Error)]
pub enum DataError {
    /// Samples or events submitted (or requested) before any header
    #[error("no header present")]
    NoHeader,

    /// Block channel count differs from the current header
    #[error("channel count mismatch: header has {expected}, block has {actual}")]
    ChannelMismatch { expected: u32, actual: u32 },

    /// Block data type differs from the current header
    #[error("data type mismatch: header has {expected:?}, block has {actual:?}")]
    TypeMismatch {
        expected: DataType,
        actual: DataType,
    },

    /// Requested index was evicted from the retained window
    #[error("index {index} evicted, oldest retained is {oldest}")]
    Evicted { index: u64, oldest: u64 },

    /// Requested index lies beyond the total accepted
    #[error("index {index} beyond total accepted {total}")]
    OutOfRange { index: u64, total: u64 },

    /// Range with `from` greater than `to`
    #[error("invalid range: from {from} > to {to}")]
    InvalidRange { from: u64, to: u64 },

    /// Header rejected at submission
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Sample block shape inconsistent with its payload
    #[error("invalid sample block: {0}")]
    InvalidBlock(#[from] ProtocolError),
}

/// Invalid store configuration; fatal at construction time
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Ring capacity must be at least one sample/event
    #[error("{kind} capacity must be positive")]
    ZeroCapacity { kind: &'static str },
}

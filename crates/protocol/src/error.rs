//! Protocol error types
//!
//! Errors that can occur when encoding or decoding protocol messages.
//! All of these are fatal to the connection that produced them; store
//! preconditions (no header, evicted index, ...) are *not* protocol
//! errors and travel as error responses instead.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame or payload ended before a required field
    #[error("truncated message while reading {0}")]
    Truncated(&'static str),

    /// Protocol version not understood by this server
    #[error("unsupported protocol version: {0:#06x}")]
    UnsupportedVersion(u16),

    /// Command code not part of the command set
    #[error("unknown command: {0:#06x}")]
    UnknownCommand(u16),

    /// Status code not part of the status set
    #[error("unknown status: {0:#06x}")]
    UnknownStatus(u16),

    /// Payload length exceeds the sane maximum
    #[error("payload length {len} exceeds maximum {max}")]
    PayloadTooLarge { len: u32, max: u32 },

    /// Payload had trailing bytes after the last field
    #[error("payload has {0} trailing bytes")]
    TrailingBytes(usize),

    /// Sample data type tag not part of the enumeration
    #[error("invalid data type tag: {0}")]
    InvalidDataType(u8),

    /// Byte order tag not 0 (little) or 1 (big)
    #[error("invalid byte order tag: {0}")]
    InvalidByteOrder(u8),

    /// Wake reason tag not part of the enumeration
    #[error("invalid wake reason tag: {0}")]
    InvalidWakeReason(u8),

    /// Sample data length does not match channels x columns x type size
    #[error("sample data length {actual} does not match {channels} channels x {columns} columns of {data_type:?} ({expected} bytes)")]
    BlockSizeMismatch {
        channels: u32,
        columns: u64,
        data_type: crate::DataType,
        expected: u64,
        actual: usize,
    },

    /// String field was not valid UTF-8
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),
}

impl ProtocolError {
    /// Create a truncation error for the named field
    #[inline]
    pub fn truncated(field: &'static str) -> Self {
        Self::Truncated(field)
    }
}

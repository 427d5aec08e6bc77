//! Pulse Protocol - wire format and core data types for the pulse buffer
//!
//! This crate provides the foundational types that flow between clients
//! and the buffer server:
//!
//! - [`Header`] - channel layout and sample encoding for a session
//! - [`SampleBlock`] - a contiguous multi-channel chunk of samples
//! - [`Event`] - a discrete annotation tied to a sample index
//! - [`Request`] / [`Response`] - framed protocol messages
//!
//! # Wire Format
//!
//! Every message is a fixed 8-byte frame head followed by a payload:
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬─────────────┐
//! │ 2 bytes      │ 2 bytes      │ 4 bytes      │ N bytes     │
//! │ version (BE) │ command /    │ length (BE)  │ payload     │
//! │              │ status (BE)  │              │             │
//! └──────────────┴──────────────┴──────────────┴─────────────┘
//! ```
//!
//! Requests carry a command code in the second field, responses a status
//! code (0 = ok). All integers are big-endian; variable-length fields are
//! length-prefixed.
//!
//! # Design Principles
//!
//! - **Copy-bounded**: sample payloads travel as `bytes::Bytes`, shared
//!   rather than re-copied between the codec and the store.
//! - **No framework**: fixed binary layout, no serde on the wire, so
//!   non-Rust acquisition clients can speak it from any language.

mod error;
mod frame;
mod message;
mod types;

pub use error::ProtocolError;
pub use frame::{Command, FrameHead, Status, FRAME_HEAD_LEN};
pub use message::{Request, Response};
pub use types::{Counts, DataType, Event, Header, SampleBlock, SampleByteOrder, WakeReason};

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Protocol version carried in every frame head
pub const PROTOCOL_VERSION: u16 = 1;

/// Maximum accepted payload length (16MB)
pub const MAX_PAYLOAD_LEN: u32 = 16 * 1024 * 1024;

// Test modules - only compiled during testing
#[cfg(test)]
mod message_test;

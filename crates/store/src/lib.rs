//! Pulse Store - in-memory sample/event stores for the buffer server
//!
//! A store holds one [`Header`](pulse_protocol::Header), the sample and
//! event streams accepted under it, and running totals. Two variants
//! implement the shared [`DataStore`] trait:
//!
//! - [`RingDataStore`] - bounded, circular, evicts the oldest entries
//!   once capacity is reached (the production choice)
//! - [`SimpleDataStore`] - unbounded, append-only, for short sessions
//!   where memory growth is acceptable
//!
//! All operations are callable concurrently; the store interior sits
//! behind a single `parking_lot::RwLock`, so every operation observes a
//! consistent header + counts + retained-window snapshot, and flushes
//! serialize strictly with puts.
//!
//! # Waiting for data
//!
//! [`wait_for_data`] parks the caller until sample/event totals reach
//! client-supplied thresholds. Stores broadcast a generation bump through
//! a `tokio::sync::watch` channel after every committed mutation; waiters
//! re-check their predicate on each bump, which rules out both lost and
//! spurious wakeups. A header reset or flush forces waiters awake with a
//! distinct [`WakeReason`](pulse_protocol::WakeReason).

mod error;
mod ring;
mod simple;
mod store;
mod wait;

pub use error::{ConfigError, DataError};
pub use ring::RingDataStore;
pub use simple::SimpleDataStore;
pub use store::DataStore;
pub use wait::{wait_for_data, WaitOutcome};

/// Result type for store operations
pub type Result<T> = std::result::Result<T, DataError>;

//! Pulse Server - networked front end of the pulse buffer
//!
//! [`BufferServer`] accepts TCP connections on a configured port, assigns
//! each client a sequential identity, and spawns one handler task per
//! connection, all bound to a single shared
//! [`DataStore`](pulse_store::DataStore) and one replaceable
//! [`Monitor`] sink. The supervisor itself never touches payload bytes;
//! its data-path role ends at connection admission and registry
//! bookkeeping.
//!
//! Administrative operations (`put_header`, `flush_*`, `stop`,
//! `add_monitor`) act on the shared store directly, bypassing the
//! network protocol, and emit the same monitor notifications as
//! network-triggered operations under the server sentinel identity.
//!
//! # Error containment
//!
//! A protocol violation or I/O failure terminates only the offending
//! connection. Store precondition failures travel back as error response
//! frames and leave the connection usable. Nothing a client sends can
//! crash the shared store or another connection.

mod config;
mod connection;
mod error;
mod monitor;
mod supervisor;

pub use config::ServerConfig;
pub use error::ServerError;
pub use monitor::{ClientId, CountingMonitor, LogMonitor, Monitor, MonitorSlot, MonitorCounts};
pub use supervisor::BufferServer;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Milliseconds since the Unix epoch, for monitor timestamps
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

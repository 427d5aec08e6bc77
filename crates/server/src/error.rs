//! Server error types

use std::io;

use pulse_protocol::ProtocolError;
use thiserror::Error;

/// Errors on the server's network paths
#[derive(Debug, Error)]
pub enum ServerError {
    /// Listening port unavailable; fatal to server startup
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// I/O failure on one connection
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed frame, unknown command/version or oversized payload;
    /// fatal to the connection that sent it
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

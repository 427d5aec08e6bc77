//! Server configuration
//!
//! Constructor-time only; nothing here is runtime-mutable.

/// Listener configuration for [`BufferServer`](crate::BufferServer)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (e.g. "0.0.0.0")
    pub address: String,

    /// Listen port; 0 picks an ephemeral port (useful in tests)
    pub port: u16,

    /// Enable TCP_NODELAY on accepted connections
    ///
    /// Acquisition clients stream many small frames; Nagle buffering
    /// would add latency to every response.
    pub nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 1972,
            nodelay: true,
        }
    }
}

impl ServerConfig {
    /// Create config with a custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Socket address string to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

//! Daemon configuration
//!
//! All fields have defaults, so an empty file (or no file at all) yields
//! a working single-buffer server on the standard port. Command line
//! flags override whatever the file says.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Which store implementation backs the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Bounded ring buffer, evicts the oldest data when full
    Ring,
    /// Unbounded append-only store, grows until flushed
    Simple,
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PulsedConfig {
    /// Address to listen on
    pub address: String,

    /// TCP port to listen on
    pub port: u16,

    /// Store implementation
    pub store: StoreKind,

    /// Combined retained capacity for the ring store
    ///
    /// When present, sets both the sample and event capacity, overriding
    /// the individual fields below.
    pub capacity: Option<usize>,

    /// Retained sample capacity (columns) for the ring store
    pub sample_capacity: usize,

    /// Retained event capacity for the ring store
    pub event_capacity: usize,

    /// Disable Nagle's algorithm on accepted connections
    pub nodelay: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for PulsedConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 1972,
            store: StoreKind::Ring,
            capacity: None,
            sample_capacity: 1024 * 1024,
            event_capacity: 64 * 1024,
            nodelay: true,
            log_level: "info".into(),
        }
    }
}

impl PulsedConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

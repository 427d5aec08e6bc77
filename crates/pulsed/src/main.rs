//! pulsed - standalone pulse buffer server
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (ring store, port 1972)
//! pulsed
//!
//! # Override port and capacities
//! pulsed --port 4000 --sample-capacity 500000
//!
//! # Load settings from a file, flags still win
//! pulsed --config configs/pulsed.toml --log-level debug
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pulse_server::{BufferServer, LogMonitor, ServerConfig};
use pulse_store::{DataStore, RingDataStore, SimpleDataStore};

use config::{PulsedConfig, StoreKind};

/// pulsed - buffering server for multichannel sample streams
#[derive(Parser, Debug)]
#[command(name = "pulsed")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    address: Option<String>,

    /// TCP port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Store implementation
    #[arg(long, value_enum)]
    store: Option<StoreKind>,

    /// Retained capacity for both samples and events in the ring store
    #[arg(long)]
    capacity: Option<usize>,

    /// Retained sample capacity (columns) for the ring store
    #[arg(long)]
    sample_capacity: Option<usize>,

    /// Retained event capacity for the ring store
    #[arg(long)]
    event_capacity: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Cli {
    /// File settings first, then explicit flags on top
    fn resolve(self) -> Result<PulsedConfig> {
        let mut config = match &self.config {
            Some(path) => PulsedConfig::load(path)?,
            None => PulsedConfig::default(),
        };
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(store) = self.store {
            config.store = store;
        }
        // Combined capacity first, the specific flags refine it
        if let Some(capacity) = self.capacity.or(config.capacity.take()) {
            config.sample_capacity = capacity;
            config.event_capacity = capacity;
        }
        if let Some(capacity) = self.sample_capacity {
            config.sample_capacity = capacity;
        }
        if let Some(capacity) = self.event_capacity {
            config.event_capacity = capacity;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().resolve()?;
    init_logging(&config.log_level)?;

    let store: Arc<dyn DataStore> = match config.store {
        StoreKind::Ring => Arc::new(
            RingDataStore::new(config.sample_capacity, config.event_capacity)
                .context("invalid ring store capacities")?,
        ),
        StoreKind::Simple => Arc::new(SimpleDataStore::new()),
    };

    let server_config = ServerConfig {
        address: config.address,
        port: config.port,
        nodelay: config.nodelay,
    };
    let server = Arc::new(BufferServer::new(server_config, store));
    server.add_monitor(Arc::new(LogMonitor));

    let handle = server.spawn();

    shutdown_signal().await;
    info!("shutdown signal received, stopping server");
    server.stop();

    handle.await.context("server task panicked")??;
    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}


/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}

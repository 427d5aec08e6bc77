//! Supervisor: listener, registry and administrative API
//!
//! `BufferServer` owns the accept loop and the live-connection registry.
//! Each accepted connection gets a sequential client id and its own
//! cancellation token; the handler task removes itself from the registry
//! on any exit path, so deregistration happens exactly once.
//!
//! `stop()` cancels the accept loop, then disconnects every client from
//! a registry snapshot taken up front - the registry lock is never held
//! while a handler's cancellation runs, so a handler deregistering
//! itself during the broadcast cannot deadlock.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pulse_protocol::{DataType, Header};
use pulse_store::DataStore;

use crate::config::ServerConfig;
use crate::connection::{handle_connection, ConnectionContext};
use crate::error::ServerError;
use crate::monitor::{ClientId, Monitor, MonitorSlot};
use crate::{now_ms, Result};

/// Registry entry for one live connection
struct ConnectionHandle {
    peer: SocketAddr,
    cancel: CancellationToken,
}

/// Lock-guarded collection of live connections
///
/// Synchronized independently of the store; nothing here is held while
/// calling into handler logic.
#[derive(Default)]
struct Registry {
    inner: Mutex<HashMap<i64, ConnectionHandle>>,
}

impl Registry {
    fn insert(&self, id: ClientId, handle: ConnectionHandle) {
        self.inner.lock().insert(id.0, handle);
    }

    fn remove(&self, id: ClientId) -> bool {
        self.inner.lock().remove(&id.0).is_some()
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Clone out ids and tokens so callers can cancel without the lock
    fn snapshot(&self) -> Vec<(ClientId, CancellationToken)> {
        self.inner
            .lock()
            .iter()
            .map(|(id, handle)| (ClientId(*id), handle.cancel.clone()))
            .collect()
    }

    fn cancel_token(&self, id: ClientId) -> Option<CancellationToken> {
        self.inner.lock().get(&id.0).map(|h| h.cancel.clone())
    }
}

/// The buffer server: accept loop, registry, administrative API
pub struct BufferServer {
    config: ServerConfig,
    store: Arc<dyn DataStore>,
    monitor: MonitorSlot,
    registry: Arc<Registry>,
    next_client_id: AtomicI64,
    cancel: CancellationToken,
    local_addr: RwLock<Option<SocketAddr>>,
}

impl BufferServer {
    /// Create a server around an already-constructed store
    ///
    /// The store variant and capacities are the caller's choice; the
    /// server treats every [`DataStore`] alike.
    pub fn new(config: ServerConfig, store: Arc<dyn DataStore>) -> Self {
        Self {
            config,
            store,
            monitor: MonitorSlot::new(),
            registry: Arc::new(Registry::default()),
            next_client_id: AtomicI64::new(0),
            cancel: CancellationToken::new(),
            local_addr: RwLock::new(None),
        }
    }

    /// The shared store
    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    /// Address actually bound, once `run` has started listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.read()
    }

    /// Number of currently live connections
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Install or replace the active monitor sink
    ///
    /// Propagates to all live connections as well as future ones; they
    /// all share the same slot.
    pub fn add_monitor(&self, monitor: Arc<dyn Monitor>) {
        self.monitor.install(monitor);
    }

    /// Bind the configured port and accept connections until stopped
    pub async fn run(self: &Arc<Self>) -> Result<()> {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ServerError::Bind {
                address: bind_addr.clone(),
                source: e,
            })?;

        if let Ok(addr) = listener.local_addr() {
            *self.local_addr.write() = Some(addr);
        }

        info!(address = %bind_addr, "buffer server listening");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => self.admit(stream, peer),
                        Err(e) => {
                            // Transient accept errors - log and continue
                            warn!(error = %e, "accept error");
                        }
                    }
                }
            }
        }

        info!("buffer server stopped accepting");
        Ok(())
    }

    /// Run the server in a background task
    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let server = Arc::clone(self);
        tokio::spawn(async move { server.run().await })
    }

    /// Register an accepted connection and spawn its handler
    fn admit(self: &Arc<Self>, stream: tokio::net::TcpStream, peer: SocketAddr) {
        if self.config.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                debug!(error = %e, "failed to set TCP_NODELAY");
            }
        }

        let id = ClientId(self.next_client_id.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();

        self.registry.insert(
            id,
            ConnectionHandle {
                peer,
                cancel: cancel.clone(),
            },
        );
        self.monitor
            .notify(|m| m.client_connected(id, peer, now_ms()));

        let ctx = ConnectionContext {
            id,
            peer,
            store: Arc::clone(&self.store),
            monitor: self.monitor.clone(),
            cancel,
        };

        let server = Arc::clone(self);
        tokio::spawn(async move {
            let peer = ctx.peer;
            let id = ctx.id;
            if let Err(e) = handle_connection(ctx, stream).await {
                debug!(%id, %peer, error = %e, "connection ended with error");
            }
            // Single exit path: deregister and report exactly once
            server.registry.remove(id);
            server
                .monitor
                .notify(|m| m.client_disconnected(id, now_ms()));
        });
    }

    /// Disconnect one client; true if it was live
    pub fn disconnect(&self, id: ClientId) -> bool {
        match self.registry.cancel_token(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop accepting and disconnect every client
    ///
    /// The registry snapshot is taken before any cancellation runs, so
    /// handlers deregistering themselves mid-broadcast are safe.
    pub fn stop(&self) {
        self.cancel.cancel();
        for (id, token) in self.registry.snapshot() {
            debug!(%id, "disconnecting client");
            token.cancel();
        }
    }

    // ------------------------------------------------------------------
    // Administrative operations (non-networked, sentinel identity)
    // ------------------------------------------------------------------

    /// Put a header into the shared store directly
    pub fn put_header(&self, channels: u32, sample_rate: f32, data_type: DataType) -> bool {
        let header = Header::new(channels, sample_rate, data_type);
        match self.store.put_header(header.clone()) {
            Ok(()) => {
                self.monitor
                    .notify(|m| m.header_put(ClientId::SERVER, &header, now_ms()));
                true
            }
            Err(e) => {
                warn!(error = %e, "administrative put_header rejected");
                false
            }
        }
    }

    /// Flush header, samples and events from the shared store
    pub fn flush_header(&self) -> bool {
        self.store.flush_header();
        self.monitor
            .notify(|m| m.header_flushed(ClientId::SERVER, now_ms()));
        true
    }

    /// Flush retained samples from the shared store
    pub fn flush_data(&self) -> bool {
        self.store.flush_data();
        self.monitor
            .notify(|m| m.data_flushed(ClientId::SERVER, now_ms()));
        true
    }

    /// Flush retained events from the shared store
    pub fn flush_events(&self) -> bool {
        self.store.flush_events();
        self.monitor
            .notify(|m| m.events_flushed(ClientId::SERVER, now_ms()));
        true
    }
}

//! Lifecycle monitors
//!
//! A [`Monitor`] observes every store lifecycle event: connects,
//! disconnects, puts and flushes. The server holds at most one active
//! sink at a time in a [`MonitorSlot`]; an empty slot means no
//! notifications are sent. Default method bodies are no-ops, so a sink
//! only implements the events it cares about.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use pulse_protocol::Header;

/// Identity of the actor behind a store operation
///
/// Network clients get sequential non-negative ids at accept time; the
/// supervisor's own administrative operations carry [`ClientId::SERVER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub i64);

impl ClientId {
    /// Sentinel for server-initiated (administrative) operations
    pub const SERVER: ClientId = ClientId(-1);
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::SERVER {
            write!(f, "server")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Observer of store lifecycle events
///
/// `at_ms` is milliseconds since the Unix epoch at the time the
/// operation committed.
pub trait Monitor: Send + Sync {
    fn client_connected(&self, _client: ClientId, _peer: SocketAddr, _at_ms: u64) {}

    fn client_disconnected(&self, _client: ClientId, _at_ms: u64) {}

    fn header_put(&self, _client: ClientId, _header: &Header, _at_ms: u64) {}

    /// `columns` new samples accepted, bringing the total to `total`
    fn samples_put(&self, _client: ClientId, _columns: u64, _total: u64, _at_ms: u64) {}

    /// `count` new events accepted, bringing the total to `total`
    fn events_put(&self, _client: ClientId, _count: u64, _total: u64, _at_ms: u64) {}

    fn header_flushed(&self, _client: ClientId, _at_ms: u64) {}

    fn data_flushed(&self, _client: ClientId, _at_ms: u64) {}

    fn events_flushed(&self, _client: ClientId, _at_ms: u64) {}
}

/// Shared, replaceable slot holding the single active monitor
///
/// The supervisor and every live connection reference the same slot, so
/// installing a sink propagates everywhere at once.
#[derive(Clone, Default)]
pub struct MonitorSlot {
    inner: Arc<RwLock<Option<Arc<dyn Monitor>>>>,
}

impl MonitorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace the active sink
    pub fn install(&self, monitor: Arc<dyn Monitor>) {
        *self.inner.write() = Some(monitor);
    }

    /// Remove the active sink
    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    /// Run `f` against the active sink, if any
    #[inline]
    pub fn notify<F: FnOnce(&dyn Monitor)>(&self, f: F) {
        let guard = self.inner.read();
        if let Some(monitor) = guard.as_deref() {
            f(monitor);
        }
    }
}

/// Console sink: one structured log line per lifecycle event
#[derive(Debug, Default)]
pub struct LogMonitor;

impl Monitor for LogMonitor {
    fn client_connected(&self, client: ClientId, peer: SocketAddr, _at_ms: u64) {
        tracing::info!(%client, %peer, "client connected");
    }

    fn client_disconnected(&self, client: ClientId, _at_ms: u64) {
        tracing::info!(%client, "client disconnected");
    }

    fn header_put(&self, client: ClientId, header: &Header, _at_ms: u64) {
        tracing::info!(
            %client,
            channels = header.channels,
            sample_rate = header.sample_rate,
            data_type = ?header.data_type,
            "header put"
        );
    }

    fn samples_put(&self, client: ClientId, columns: u64, total: u64, _at_ms: u64) {
        tracing::debug!(%client, columns, total, "samples put");
    }

    fn events_put(&self, client: ClientId, count: u64, total: u64, _at_ms: u64) {
        tracing::debug!(%client, count, total, "events put");
    }

    fn header_flushed(&self, client: ClientId, _at_ms: u64) {
        tracing::info!(%client, "header flushed");
    }

    fn data_flushed(&self, client: ClientId, _at_ms: u64) {
        tracing::info!(%client, "data flushed");
    }

    fn events_flushed(&self, client: ClientId, _at_ms: u64) {
        tracing::info!(%client, "events flushed");
    }
}

/// Aggregating sink: counts every lifecycle event
#[derive(Debug, Default)]
pub struct CountingMonitor {
    connects: AtomicU64,
    disconnects: AtomicU64,
    header_puts: AtomicU64,
    sample_puts: AtomicU64,
    samples_total: AtomicU64,
    event_puts: AtomicU64,
    events_total: AtomicU64,
    flushes: AtomicU64,
}

/// Point-in-time view of a [`CountingMonitor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorCounts {
    pub connects: u64,
    pub disconnects: u64,
    pub header_puts: u64,
    pub sample_puts: u64,
    pub samples_total: u64,
    pub event_puts: u64,
    pub events_total: u64,
    pub flushes: u64,
}

impl CountingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MonitorCounts {
        MonitorCounts {
            connects: self.connects.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            header_puts: self.header_puts.load(Ordering::Relaxed),
            sample_puts: self.sample_puts.load(Ordering::Relaxed),
            samples_total: self.samples_total.load(Ordering::Relaxed),
            event_puts: self.event_puts.load(Ordering::Relaxed),
            events_total: self.events_total.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }
}

impl Monitor for CountingMonitor {
    fn client_connected(&self, _client: ClientId, _peer: SocketAddr, _at_ms: u64) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    fn client_disconnected(&self, _client: ClientId, _at_ms: u64) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    fn header_put(&self, _client: ClientId, _header: &Header, _at_ms: u64) {
        self.header_puts.fetch_add(1, Ordering::Relaxed);
    }

    fn samples_put(&self, _client: ClientId, columns: u64, _total: u64, _at_ms: u64) {
        self.sample_puts.fetch_add(1, Ordering::Relaxed);
        self.samples_total.fetch_add(columns, Ordering::Relaxed);
    }

    fn events_put(&self, _client: ClientId, count: u64, _total: u64, _at_ms: u64) {
        self.event_puts.fetch_add(1, Ordering::Relaxed);
        self.events_total.fetch_add(count, Ordering::Relaxed);
    }

    fn header_flushed(&self, _client: ClientId, _at_ms: u64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    fn data_flushed(&self, _client: ClientId, _at_ms: u64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    fn events_flushed(&self, _client: ClientId, _at_ms: u64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[path = "monitor_test.rs"]
mod tests;

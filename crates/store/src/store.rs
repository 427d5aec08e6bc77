//! The `DataStore` capability
//!
//! Every store variant implements this trait; connections and the
//! supervisor only ever see `Arc<dyn DataStore>`.

use pulse_protocol::{Counts, Event, Header, SampleBlock};
use tokio::sync::watch;

use crate::Result;

/// Shared store interface for sample/event buffering
///
/// All operations may be invoked concurrently from multiple connections.
/// Mutations commit under the store's write lock and then bump the
/// generation channel, so a waiter that subscribed before checking its
/// predicate can never miss a wakeup.
pub trait DataStore: Send + Sync {
    /// Replace the current header; resets both counters and discards all
    /// retained samples and events. Waiters observe this as a forced wake.
    fn put_header(&self, header: Header) -> Result<()>;

    /// Current header, or `DataError::NoHeader`
    fn get_header(&self) -> Result<Header>;

    /// Append a sample block; returns the new total sample count.
    ///
    /// Fails if no header is present or the block's channel count or data
    /// type differ from the header's. Oldest samples are evicted once a
    /// bounded store reaches capacity.
    fn put_samples(&self, block: &SampleBlock) -> Result<u64>;

    /// Append events in arrival order; returns the new total event count
    fn put_events(&self, events: Vec<Event>) -> Result<u64>;

    /// Samples in the half-open index range `[from, to)`
    ///
    /// Fails with `Evicted` if `from` precedes the retained window and
    /// with `OutOfRange` if `to` exceeds the total accepted. Indices are
    /// never silently clamped.
    fn get_samples(&self, from: u64, to: u64) -> Result<SampleBlock>;

    /// Events in the half-open index range `[from, to)`
    fn get_events(&self, from: u64, to: u64) -> Result<Vec<Event>>;

    /// Clear header, samples and events; zero both counters
    fn flush_header(&self);

    /// Clear retained samples and zero the sample counter only
    fn flush_data(&self);

    /// Clear retained events and zero the event counter only
    fn flush_events(&self);

    /// Totals accepted since the respective flush
    fn counts(&self) -> Counts;

    /// Monotonic count of header resets and flushes
    ///
    /// A change while parked in a wait means the wait was force-woken.
    fn flush_epoch(&self) -> u64;

    /// Subscribe to the store's mutation generation channel
    fn subscribe(&self) -> watch::Receiver<u64>;
}

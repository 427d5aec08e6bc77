//! Bounded circular store
//!
//! `RingDataStore` retains the most recent `sample_capacity` sample
//! columns and `event_capacity` events, evicting the oldest past
//! capacity. Samples live in one flat circular byte region (row size is
//! fixed per header), so an append is at most two `copy_from_slice`
//! segments regardless of fill level - O(1) amortized per column, never
//! a full-buffer shift.
//!
//! External indices are translated through a base index
//! (`total - retained`): anything below it is gone and reported as an
//! eviction error, never clamped.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;
use pulse_protocol::{Counts, Event, Header, SampleBlock};
use tokio::sync::watch;

use crate::error::{ConfigError, DataError};
use crate::store::DataStore;
use crate::Result;

/// Bounded circular implementation of [`DataStore`]
pub struct RingDataStore {
    state: RwLock<RingState>,
    generation: watch::Sender<u64>,
}

struct RingState {
    header: Option<Header>,
    samples: SampleRing,
    events: EventRing,
    flush_epoch: u64,
}

impl RingDataStore {
    /// Create a ring store with independent sample and event capacities
    ///
    /// Capacities are in columns (samples) and events respectively; both
    /// must be positive.
    pub fn new(sample_capacity: usize, event_capacity: usize) -> std::result::Result<Self, ConfigError> {
        if sample_capacity == 0 {
            return Err(ConfigError::ZeroCapacity { kind: "sample" });
        }
        if event_capacity == 0 {
            return Err(ConfigError::ZeroCapacity { kind: "event" });
        }
        let (generation, _) = watch::channel(0);
        Ok(Self {
            state: RwLock::new(RingState {
                header: None,
                samples: SampleRing::new(sample_capacity),
                events: EventRing::new(event_capacity),
                flush_epoch: 0,
            }),
            generation,
        })
    }

    /// Create a ring store with one combined capacity for both kinds
    pub fn with_capacity(capacity: usize) -> std::result::Result<Self, ConfigError> {
        Self::new(capacity, capacity)
    }

    /// Bump the generation after a committed mutation
    fn notify(&self) {
        self.generation.send_modify(|g| *g = g.wrapping_add(1));
    }
}

impl DataStore for RingDataStore {
    fn put_header(&self, header: Header) -> Result<()> {
        validate_header(&header)?;
        {
            let mut state = self.state.write();
            state.samples.reset(header.row_size());
            state.events.clear();
            state.header = Some(header);
            state.flush_epoch += 1;
        }
        self.notify();
        Ok(())
    }

    fn get_header(&self) -> Result<Header> {
        self.state.read().header.clone().ok_or(DataError::NoHeader)
    }

    fn put_samples(&self, block: &SampleBlock) -> Result<u64> {
        let total = {
            let mut state = self.state.write();
            let header = state.header.as_ref().ok_or(DataError::NoHeader)?;
            check_block(header, block)?;
            state.samples.push(block.data(), block.columns());
            state.samples.total
        };
        self.notify();
        Ok(total)
    }

    fn put_events(&self, events: Vec<Event>) -> Result<u64> {
        let total = {
            let mut state = self.state.write();
            if state.header.is_none() {
                return Err(DataError::NoHeader);
            }
            state.events.push(events);
            state.events.total
        };
        self.notify();
        Ok(total)
    }

    fn get_samples(&self, from: u64, to: u64) -> Result<SampleBlock> {
        let state = self.state.read();
        let header = state.header.as_ref().ok_or(DataError::NoHeader)?;
        let data = state.samples.get(from, to)?;
        Ok(SampleBlock::new(
            header.channels,
            to - from,
            header.data_type,
            data,
        )?)
    }

    fn get_events(&self, from: u64, to: u64) -> Result<Vec<Event>> {
        let state = self.state.read();
        if state.header.is_none() {
            return Err(DataError::NoHeader);
        }
        state.events.get(from, to)
    }

    fn flush_header(&self) {
        {
            let mut state = self.state.write();
            state.header = None;
            state.samples.reset(0);
            state.events.clear();
            state.flush_epoch += 1;
        }
        self.notify();
    }

    fn flush_data(&self) {
        {
            let mut state = self.state.write();
            state.samples.clear();
            state.flush_epoch += 1;
        }
        self.notify();
    }

    fn flush_events(&self) {
        {
            let mut state = self.state.write();
            state.events.clear();
            state.flush_epoch += 1;
        }
        self.notify();
    }

    fn counts(&self) -> Counts {
        let state = self.state.read();
        Counts {
            samples: state.samples.total,
            events: state.events.total,
        }
    }

    fn flush_epoch(&self) -> u64 {
        self.state.read().flush_epoch
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}

/// Reject headers the store could never serve
pub(crate) fn validate_header(header: &Header) -> Result<()> {
    if header.channels == 0 {
        return Err(DataError::InvalidHeader("channel count must be positive".into()));
    }
    if !header.sample_rate.is_finite() || header.sample_rate < 0.0 {
        return Err(DataError::InvalidHeader(format!(
            "sample rate must be a non-negative number, got {}",
            header.sample_rate
        )));
    }
    Ok(())
}

/// Reject blocks that do not fit the current header
pub(crate) fn check_block(header: &Header, block: &SampleBlock) -> Result<()> {
    if block.channels() != header.channels {
        return Err(DataError::ChannelMismatch {
            expected: header.channels,
            actual: block.channels(),
        });
    }
    if block.data_type() != header.data_type {
        return Err(DataError::TypeMismatch {
            expected: header.data_type,
            actual: block.data_type(),
        });
    }
    Ok(())
}

/// Validate `[from, to)` against totals and the retained base index
pub(crate) fn check_range(from: u64, to: u64, base: u64, total: u64) -> Result<()> {
    if from > to {
        return Err(DataError::InvalidRange { from, to });
    }
    if to > total {
        return Err(DataError::OutOfRange { index: to, total });
    }
    if from < base {
        return Err(DataError::Evicted {
            index: from,
            oldest: base,
        });
    }
    Ok(())
}

/// Flat circular byte region over sample columns
struct SampleRing {
    /// Capacity in columns
    capacity: usize,
    /// Bytes per column; zero until a header arrives
    row_size: usize,
    buf: Vec<u8>,
    /// Ring slot of the oldest retained column
    start: usize,
    /// Retained columns
    len: usize,
    /// Columns accepted since the last header/data flush
    total: u64,
}

impl SampleRing {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            row_size: 0,
            buf: Vec::new(),
            start: 0,
            len: 0,
            total: 0,
        }
    }

    /// Re-dimension for a new header and drop everything retained
    fn reset(&mut self, row_size: usize) {
        self.row_size = row_size;
        self.buf = vec![0; self.capacity * row_size];
        self.clear();
    }

    /// Drop retained columns and zero the counter; keeps dimensions
    fn clear(&mut self) {
        self.start = 0;
        self.len = 0;
        self.total = 0;
    }

    /// Oldest retrievable column index
    fn base(&self) -> u64 {
        self.total - self.len as u64
    }

    /// Append `columns` columns of raw data, evicting the oldest on overflow
    ///
    /// A block longer than the whole ring keeps only the tail that fits;
    /// the total still advances by the full column count so external
    /// indices stay honest.
    fn push(&mut self, data: &[u8], columns: u64) {
        let row = self.row_size;
        let cols = columns as usize;
        if cols == 0 {
            return;
        }

        if cols >= self.capacity {
            let skip = (cols - self.capacity) * row;
            self.buf.copy_from_slice(&data[skip..]);
            self.start = 0;
            self.len = self.capacity;
        } else {
            let write = (self.start + self.len) % self.capacity;
            let first = cols.min(self.capacity - write);
            self.buf[write * row..(write + first) * row].copy_from_slice(&data[..first * row]);
            if first < cols {
                let rest = cols - first;
                self.buf[..rest * row].copy_from_slice(&data[first * row..]);
            }

            if self.len + cols <= self.capacity {
                self.len += cols;
            } else {
                let evicted = self.len + cols - self.capacity;
                self.start = (self.start + evicted) % self.capacity;
                self.len = self.capacity;
            }
        }

        self.total += columns;
    }

    /// Copy out columns `[from, to)` as one contiguous buffer
    fn get(&self, from: u64, to: u64) -> Result<Bytes> {
        check_range(from, to, self.base(), self.total)?;

        let row = self.row_size;
        let n = (to - from) as usize;
        let mut out = BytesMut::with_capacity(n * row);

        let pos = (self.start + (from - self.base()) as usize) % self.capacity;
        let first = n.min(self.capacity - pos);
        out.extend_from_slice(&self.buf[pos * row..(pos + first) * row]);
        if first < n {
            out.extend_from_slice(&self.buf[..(n - first) * row]);
        }

        Ok(out.freeze())
    }
}

/// Capacity-bounded event queue, oldest out first
struct EventRing {
    capacity: usize,
    events: VecDeque<Event>,
    /// Events accepted since the last header/event flush
    total: u64,
}

impl EventRing {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
            total: 0,
        }
    }

    fn clear(&mut self) {
        self.events.clear();
        self.total = 0;
    }

    fn base(&self) -> u64 {
        self.total - self.events.len() as u64
    }

    fn push(&mut self, events: Vec<Event>) {
        self.total += events.len() as u64;
        for event in events {
            if self.events.len() == self.capacity {
                self.events.pop_front();
            }
            self.events.push_back(event);
        }
    }

    fn get(&self, from: u64, to: u64) -> Result<Vec<Event>> {
        check_range(from, to, self.base(), self.total)?;
        let skip = (from - self.base()) as usize;
        let n = (to - from) as usize;
        Ok(self.events.iter().skip(skip).take(n).cloned().collect())
    }
}

#[cfg(test)]
#[path = "ring_test.rs"]
mod tests;

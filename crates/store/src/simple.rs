//! Unbounded append-only store
//!
//! Same contracts as [`RingDataStore`](crate::RingDataStore) but nothing
//! is ever evicted, so `get_samples`/`get_events` can only fail with
//! range errors beyond the total. Intended for short-lived or
//! bounded-duration sessions where memory growth is acceptable.

use bytes::Bytes;
use parking_lot::RwLock;
use pulse_protocol::{Counts, Event, Header, SampleBlock};
use tokio::sync::watch;

use crate::error::DataError;
use crate::ring::{check_block, check_range, validate_header};
use crate::store::DataStore;
use crate::Result;

/// Unbounded implementation of [`DataStore`]
pub struct SimpleDataStore {
    state: RwLock<SimpleState>,
    generation: watch::Sender<u64>,
}

struct SimpleState {
    header: Option<Header>,
    /// Raw sample bytes, columns appended back to back
    data: Vec<u8>,
    row_size: usize,
    sample_total: u64,
    events: Vec<Event>,
    event_total: u64,
    flush_epoch: u64,
}

impl SimpleDataStore {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            state: RwLock::new(SimpleState {
                header: None,
                data: Vec::new(),
                row_size: 0,
                sample_total: 0,
                events: Vec::new(),
                event_total: 0,
                flush_epoch: 0,
            }),
            generation,
        }
    }

    fn notify(&self) {
        self.generation.send_modify(|g| *g = g.wrapping_add(1));
    }
}

impl Default for SimpleDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore for SimpleDataStore {
    fn put_header(&self, header: Header) -> Result<()> {
        validate_header(&header)?;
        {
            let mut state = self.state.write();
            state.row_size = header.row_size();
            state.data.clear();
            state.sample_total = 0;
            state.events.clear();
            state.event_total = 0;
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
            state.data.extend_from_slice(block.data());
            state.sample_total += block.columns();
            state.sample_total
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
            state.event_total += events.len() as u64;
            state.events.extend(events);
            state.event_total
        };
        self.notify();
        Ok(total)
    }

    fn get_samples(&self, from: u64, to: u64) -> Result<SampleBlock> {
        let state = self.state.read();
        let header = state.header.as_ref().ok_or(DataError::NoHeader)?;
        check_range(from, to, 0, state.sample_total)?;

        let row = state.row_size;
        let data = Bytes::copy_from_slice(&state.data[from as usize * row..to as usize * row]);
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
        check_range(from, to, 0, state.event_total)?;
        Ok(state.events[from as usize..to as usize].to_vec())
    }

    fn flush_header(&self) {
        {
            let mut state = self.state.write();
            state.header = None;
            state.row_size = 0;
            state.data.clear();
            state.sample_total = 0;
            state.events.clear();
            state.event_total = 0;
            state.flush_epoch += 1;
        }
        self.notify();
    }

    fn flush_data(&self) {
        {
            let mut state = self.state.write();
            state.data.clear();
            state.sample_total = 0;
            state.flush_epoch += 1;
        }
        self.notify();
    }

    fn flush_events(&self) {
        {
            let mut state = self.state.write();
            state.events.clear();
            state.event_total = 0;
            state.flush_epoch += 1;
        }
        self.notify();
    }

    fn counts(&self) -> Counts {
        let state = self.state.read();
        Counts {
            samples: state.sample_total,
            events: state.event_total,
        }
    }

    fn flush_epoch(&self) -> u64 {
        self.state.read().flush_epoch
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}

#[cfg(test)]
#[path = "simple_test.rs"]
mod tests;

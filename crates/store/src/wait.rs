//! Blocking wait-for-data coordination
//!
//! The waiter subscribes to the store's generation channel *before* the
//! first predicate check, so a mutation that lands between check and park
//! still shows up as an unseen generation and wakes the waiter (no lost
//! wakeups). Every wake re-evaluates the predicate (no trust in spurious
//! wakeups), and the deadline is measured against the runtime's monotonic
//! clock so it fires even when nothing mutates.

use std::time::Duration;

use pulse_protocol::{Counts, WakeReason};
use tokio::time::{timeout_at, Instant};

use crate::store::DataStore;

/// What a [`wait_for_data`] call observed at wake time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Totals at the moment the wait ended
    pub counts: Counts,
    /// Why the wait ended
    pub wake: WakeReason,
}

/// Park until `samples >= min_samples` OR `events >= min_events`, a
/// flush/header-reset occurs, or the timeout elapses.
///
/// Already-satisfied thresholds return immediately. A timeout returns the
/// counts observed (possibly below threshold) - that is a signal to
/// re-poll or give up, not an error. Callers interested in only one kind
/// should pass `u64::MAX` for the other threshold, since either side
/// reaching its minimum satisfies the wait.
pub async fn wait_for_data<S>(
    store: &S,
    min_samples: u64,
    min_events: u64,
    timeout: Duration,
) -> WaitOutcome
where
    S: DataStore + ?Sized,
{
    let deadline = Instant::now() + timeout;
    let mut generation = store.subscribe();
    // Mark the current generation seen; changed() then wakes on anything newer
    generation.borrow_and_update();
    let epoch = store.flush_epoch();

    loop {
        let counts = store.counts();
        if counts.samples >= min_samples || counts.events >= min_events {
            return WaitOutcome {
                counts,
                wake: WakeReason::Satisfied,
            };
        }
        if store.flush_epoch() != epoch {
            return WaitOutcome {
                counts,
                wake: WakeReason::Flushed,
            };
        }

        match timeout_at(deadline, generation.changed()).await {
            Ok(Ok(())) => continue,
            // Generation channel gone means the store is tearing down;
            // report it like a forced wake
            Ok(Err(_)) => {
                return WaitOutcome {
                    counts: store.counts(),
                    wake: WakeReason::Flushed,
                }
            }
            Err(_) => {
                return WaitOutcome {
                    counts: store.counts(),
                    wake: WakeReason::Timeout,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "wait_test.rs"]
mod tests;

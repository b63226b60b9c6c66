//! Keyed concurrency admission.
//!
//! Unlike `tokio::sync::Semaphore`, admission never waits: a caller over the
//! limit gets [`SlotDenied`] back immediately. Limits are supplied per call so
//! one gate can serve keys with different ceilings.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use steward_utils::lock_unpoisoned;

/// Returned when `key` already has `limit` slots in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDenied {
    pub in_flight: u32,
    pub limit: u32,
}

type Counters = Arc<Mutex<HashMap<String, u32>>>;

#[derive(Debug, Clone, Default)]
pub struct ConcurrencyGate {
    counters: Counters,
}

impl ConcurrencyGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one slot for `key` if fewer than `limit` are in flight.
    pub fn acquire(&self, key: &str, limit: u32) -> Result<ConcurrencySlot, SlotDenied> {
        let mut counters = lock_unpoisoned(&self.counters);
        let in_flight = counters.get(key).copied().unwrap_or(0);
        if in_flight >= limit {
            tracing::debug!(key, in_flight, limit, "Concurrency limit reached");
            return Err(SlotDenied { in_flight, limit });
        }
        counters.insert(key.to_string(), in_flight + 1);
        Ok(ConcurrencySlot {
            counters: Arc::clone(&self.counters),
            key: key.to_string(),
            held: true,
        })
    }

    #[must_use]
    pub fn in_flight(&self, key: &str) -> u32 {
        lock_unpoisoned(&self.counters).get(key).copied().unwrap_or(0)
    }

    /// Number of keys with at least one slot held.
    #[must_use]
    pub fn active_keys(&self) -> usize {
        lock_unpoisoned(&self.counters).len()
    }
}

/// One admitted unit of concurrency.
///
/// Released by [`release`](Self::release) or on drop, whichever comes first,
/// so error paths and cancelled futures give the slot back too.
#[derive(Debug)]
#[must_use = "dropping a ConcurrencySlot releases it immediately"]
pub struct ConcurrencySlot {
    counters: Counters,
    key: String,
    held: bool,
}

impl ConcurrencySlot {
    /// Give the slot back. Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if !std::mem::take(&mut self.held) {
            return;
        }
        let mut counters = lock_unpoisoned(&self.counters);
        match counters.get_mut(&self.key) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                counters.remove(&self.key);
            }
            None => {
                tracing::warn!(key = %self.key, "Released a slot for an untracked key");
            }
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held
    }
}

impl Drop for ConcurrencySlot {
    fn drop(&mut self) {
        self.release();
    }
}

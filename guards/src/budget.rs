//! Cumulative usage ceilings per metric and fixed window.
//!
//! Every consumption is recorded, including rejected ones, so the ledger shows
//! true demand rather than only what was granted.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use steward_types::retry_after_secs;
use steward_utils::{duration_ms, lock_unpoisoned};

use crate::DEFAULT_GC_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDecision {
    pub ok: bool,
    /// Running total for the current window, including this consumption.
    pub used: u64,
    pub limit: u64,
    /// Zero when admitted; otherwise whole seconds until the window rolls (at least 1).
    pub retry_after_secs: u64,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    used: u64,
    length_ms: u64,
}

#[derive(Debug)]
pub struct BudgetLedger {
    /// Keyed by `(metric, window index)` with index = `now / window`.
    buckets: Mutex<HashMap<(String, u64), Bucket>>,
    gc_threshold: usize,
}

impl Default for BudgetLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl BudgetLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::with_gc_threshold(DEFAULT_GC_THRESHOLD)
    }

    #[must_use]
    pub fn with_gc_threshold(gc_threshold: usize) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            gc_threshold,
        }
    }

    /// Record `amount` against `metric` and report whether the window is still
    /// within `limit`.
    pub fn consume(
        &self,
        metric: &str,
        amount: u64,
        limit: u64,
        window: Duration,
        now_ms: u64,
    ) -> BudgetDecision {
        let length_ms = duration_ms(window).max(1);
        let index = now_ms / length_ms;
        let mut buckets = lock_unpoisoned(&self.buckets);

        let bucket = buckets
            .entry((metric.to_string(), index))
            .or_insert(Bucket { used: 0, length_ms });
        bucket.used = bucket.used.saturating_add(amount);
        let used = bucket.used;

        let ok = used <= limit;
        let retry_after = if ok {
            0
        } else {
            let window_end = index.saturating_add(1).saturating_mul(length_ms);
            retry_after_secs(window_end.saturating_sub(now_ms))
        };

        if buckets.len() > self.gc_threshold {
            buckets.retain(|(_, idx), b| *idx >= now_ms / b.length_ms);
        }
        drop(buckets);

        if !ok {
            tracing::debug!(metric, used, limit, "Budget ceiling exceeded");
        }
        BudgetDecision {
            ok,
            used,
            limit,
            retry_after_secs: retry_after,
        }
    }

    /// Usage recorded so far for `metric` in the window containing `now_ms`.
    #[must_use]
    pub fn used(&self, metric: &str, window: Duration, now_ms: u64) -> u64 {
        let length_ms = duration_ms(window).max(1);
        lock_unpoisoned(&self.buckets)
            .get(&(metric.to_string(), now_ms / length_ms))
            .map_or(0, |b| b.used)
    }

    #[must_use]
    pub fn tracked_buckets(&self) -> usize {
        lock_unpoisoned(&self.buckets).len()
    }
}

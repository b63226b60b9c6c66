//! Fixed-window request limiter.
//!
//! O(1) memory and lookup per key. Because windows are fixed rather than
//! sliding, a caller can land `limit` requests at the end of one window and
//! `limit` more at the start of the next: up to `2 x limit` across a boundary.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use steward_types::retry_after_secs;
use steward_utils::{duration_ms, lock_unpoisoned};

use crate::DEFAULT_GC_THRESHOLD;

/// Outcome of [`WindowedLimiter::consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateDecision {
    pub ok: bool,
    /// Requests still admissible in the current window.
    pub remaining: u32,
    /// Zero when admitted; otherwise whole seconds until the window rolls (at least 1).
    pub retry_after_secs: u64,
    /// Requests counted in the current window, including this one.
    pub current: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at_ms: u64,
    length_ms: u64,
    count: u32,
}

impl Window {
    fn is_over(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.started_at_ms) >= self.length_ms
    }
}

#[derive(Debug)]
pub struct WindowedLimiter {
    windows: Mutex<HashMap<String, Window>>,
    gc_threshold: usize,
}

impl Default for WindowedLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowedLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_gc_threshold(DEFAULT_GC_THRESHOLD)
    }

    #[must_use]
    pub fn with_gc_threshold(gc_threshold: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            gc_threshold,
        }
    }

    /// Count one request against `key` and decide whether it is admitted.
    ///
    /// A zero-length window is treated as one millisecond.
    pub fn consume(&self, key: &str, limit: u32, window: Duration, now_ms: u64) -> RateDecision {
        let length_ms = duration_ms(window).max(1);
        let mut windows = lock_unpoisoned(&self.windows);

        let fresh = Window {
            started_at_ms: now_ms,
            length_ms,
            count: 0,
        };
        let window = windows.entry(key.to_string()).or_insert(fresh);
        if window.is_over(now_ms) {
            *window = fresh;
        }
        window.count = window.count.saturating_add(1);

        let ok = window.count <= limit;
        let retry_after = if ok {
            0
        } else {
            let ends_at = window.started_at_ms.saturating_add(window.length_ms);
            retry_after_secs(ends_at.saturating_sub(now_ms))
        };
        let decision = RateDecision {
            ok,
            remaining: limit.saturating_sub(window.count),
            retry_after_secs: retry_after,
            current: window.count,
            limit,
        };

        if windows.len() > self.gc_threshold {
            let before = windows.len();
            windows.retain(|_, w| !w.is_over(now_ms));
            tracing::debug!(
                evicted = before - windows.len(),
                remaining = windows.len(),
                "Swept stale rate windows"
            );
        }

        if !decision.ok {
            tracing::debug!(key, current = decision.current, limit, "Rate limit exceeded");
        }
        decision
    }

    /// Number of tracked keys (stale ones included until swept).
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        lock_unpoisoned(&self.windows).len()
    }
}

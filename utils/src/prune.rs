//! Throttled housekeeping and TTL arithmetic.
//!
//! Sweeps ride on ordinary calls instead of a scheduler thread. [`PruneGate`]
//! lets at most one caller per interval win the right to sweep, no matter how
//! many calls race through it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Sentinel for "never swept"; the first caller always wins.
const NEVER: u64 = u64::MAX;

#[derive(Debug)]
pub struct PruneGate {
    interval_ms: u64,
    last_run_ms: AtomicU64,
}

impl PruneGate {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: duration_ms(interval),
            last_run_ms: AtomicU64::new(NEVER),
        }
    }

    /// Claim the sweep slot for `now_ms`.
    ///
    /// Returns `true` for exactly one caller per interval. A clock that moved
    /// backwards re-arms the gate rather than wedging it shut.
    pub fn try_claim(&self, now_ms: u64) -> bool {
        let last = self.last_run_ms.load(Ordering::Acquire);
        if last != NEVER && now_ms >= last && now_ms - last < self.interval_ms {
            return false;
        }
        self.last_run_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Whether something stamped at `stored_at_ms` has outlived `ttl` at `now_ms`.
///
/// Stamps from the future (clock skew between processes) count as fresh.
#[must_use]
pub fn is_expired(stored_at_ms: u64, now_ms: u64, ttl: Duration) -> bool {
    now_ms.saturating_sub(stored_at_ms) > duration_ms(ttl)
}

#[must_use]
pub fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{PruneGate, is_expired};

    #[test]
    fn gate_admits_once_per_interval() {
        let gate = PruneGate::new(Duration::from_secs(60));
        assert!(gate.try_claim(1_000));
        assert!(!gate.try_claim(1_001));
        assert!(!gate.try_claim(60_999));
        assert!(gate.try_claim(61_000));
    }

    #[test]
    fn gate_rearms_when_clock_goes_backwards() {
        let gate = PruneGate::new(Duration::from_secs(60));
        assert!(gate.try_claim(100_000));
        assert!(gate.try_claim(50_000));
    }

    #[test]
    fn concurrent_claims_have_single_winner() {
        let gate = Arc::new(PruneGate::new(Duration::from_secs(60)));
        let winners: usize = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || gate.try_claim(5_000))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| usize::from(h.join().expect("thread")))
            .sum();
        assert_eq!(winners, 1);
    }

    #[test]
    fn expiry_is_strictly_after_ttl() {
        let ttl = Duration::from_millis(1_000);
        assert!(!is_expired(0, 1_000, ttl));
        assert!(is_expired(0, 1_001, ttl));
        assert!(!is_expired(5_000, 1_000, ttl));
    }
}

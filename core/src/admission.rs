//! Admission outcomes handed back to HTTP handlers and agent runners.

use serde::Serialize;
use steward_guards::{BudgetDecision, ConcurrencySlot, RateDecision, SlotDenied};
use thiserror::Error;

/// Seconds a caller turned away for concurrency should wait before retrying.
/// Slots free up when streams close, so there is no window to report.
pub const STREAM_RETRY_AFTER_SECS: u64 = 1;

/// HTTP status a [`Denial`] maps to.
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Outcome of a guarded request.
#[derive(Debug)]
#[must_use]
pub enum Admission<T> {
    Admitted(T),
    Denied(Denial),
}

impl<T> Admission<T> {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }

    /// `Ok` when admitted, so handlers can `?` a denial into their error type.
    pub fn into_result(self) -> Result<T, Denial> {
        match self {
            Self::Admitted(value) => Ok(value),
            Self::Denied(denial) => Err(denial),
        }
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Self::Admitted(_) => None,
            Self::Denied(denial) => Some(denial),
        }
    }
}

/// Why a request was turned away, with enough context for a 429 body.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Denial {
    #[error("rate limit exceeded for {key}: {current}/{limit} requests, retry in {retry_after_secs}s")]
    RateLimited {
        key: String,
        current: u32,
        limit: u32,
        retry_after_secs: u64,
    },
    #[error("too many concurrent streams for {key}: {in_flight}/{limit} in flight")]
    TooManyStreams {
        key: String,
        in_flight: u32,
        limit: u32,
        retry_after_secs: u64,
    },
    #[error("budget exhausted for {metric}: {used}/{limit} used, retry in {retry_after_secs}s")]
    BudgetExceeded {
        metric: String,
        used: u64,
        limit: u64,
        retry_after_secs: u64,
    },
}

impl Denial {
    pub(crate) fn rate(key: &str, decision: &RateDecision) -> Self {
        Self::RateLimited {
            key: key.to_string(),
            current: decision.current,
            limit: decision.limit,
            retry_after_secs: decision.retry_after_secs,
        }
    }

    pub(crate) fn streams(key: &str, denied: &SlotDenied) -> Self {
        Self::TooManyStreams {
            key: key.to_string(),
            in_flight: denied.in_flight,
            limit: denied.limit,
            retry_after_secs: STREAM_RETRY_AFTER_SECS,
        }
    }

    pub(crate) fn budget(metric: &str, decision: &BudgetDecision) -> Self {
        Self::BudgetExceeded {
            metric: metric.to_string(),
            used: decision.used,
            limit: decision.limit,
            retry_after_secs: decision.retry_after_secs,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        TOO_MANY_REQUESTS
    }

    /// Value for the `Retry-After` header.
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            Self::RateLimited {
                retry_after_secs, ..
            }
            | Self::TooManyStreams {
                retry_after_secs, ..
            }
            | Self::BudgetExceeded {
                retry_after_secs, ..
            } => *retry_after_secs,
        }
    }
}

/// Clearance to proxy one request upstream.
///
/// Holds a concurrency slot for `purpose:identity`; the slot is released when
/// the permit is dropped, so keep it alive until the response stream closes.
#[derive(Debug)]
#[must_use = "dropping the permit releases its stream slot immediately"]
pub struct ProxyPermit {
    slot: ConcurrencySlot,
    rate: RateDecision,
}

impl ProxyPermit {
    pub(crate) fn new(slot: ConcurrencySlot, rate: RateDecision) -> Self {
        Self { slot, rate }
    }

    /// The guard key, `purpose:identity`.
    pub fn key(&self) -> &str {
        self.slot.key()
    }

    /// Requests left in the current rate window.
    pub fn remaining(&self) -> u32 {
        self.rate.remaining
    }

    /// Release the stream slot now rather than at drop.
    pub fn release(mut self) {
        self.slot.release();
    }
}

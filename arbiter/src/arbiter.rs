use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use steward_types::{IdempotencyKey, ResourceKey};
use steward_utils::lock_unpoisoned;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::chain::{ChainSlot, Link};

/// How long a completed idempotency key suppresses repeats.
pub const DEFAULT_DEDUPE_TTL: Duration = Duration::from_secs(30);

/// Result of [`MutationArbiter::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Execution<T> {
    /// The key completed within the dedupe TTL; the operation was not invoked.
    Deduped,
    /// The operation ran to completion on this call.
    Completed(T),
}

impl<T> Execution<T> {
    pub fn is_deduped(&self) -> bool {
        matches!(self, Self::Deduped)
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Deduped => None,
            Self::Completed(value) => Some(value),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct State {
    /// Tail of the pending chain per resource.
    pub(crate) chains: HashMap<String, Link>,
    /// Idempotency keys by completion time.
    seen: HashMap<String, Instant>,
    next_ticket: u64,
}

impl State {
    fn evict_expired(&mut self, now: Instant, ttl: Duration) {
        self.seen.retain(|_, at| now.duration_since(*at) < ttl);
    }

    fn is_fresh(&self, key: &str, now: Instant, ttl: Duration) -> bool {
        self.seen
            .get(key)
            .is_some_and(|at| now.duration_since(*at) < ttl)
    }
}

#[derive(Debug)]
pub(crate) struct Inner {
    pub(crate) state: Mutex<State>,
    dedupe_ttl: Duration,
}

/// Serializes mutations per resource and suppresses retried operations.
///
/// Cloning is cheap and yields a handle onto the same tables. Tables are
/// process-local: two processes arbitrating the same resource do not see
/// each other.
#[derive(Debug, Clone)]
pub struct MutationArbiter {
    inner: Arc<Inner>,
}

impl Default for MutationArbiter {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUPE_TTL)
    }
}

impl MutationArbiter {
    #[must_use]
    pub fn new(dedupe_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                dedupe_ttl,
            }),
        }
    }

    #[must_use]
    pub fn dedupe_ttl(&self) -> Duration {
        self.inner.dedupe_ttl
    }

    /// Run `operation` once every operation queued earlier on `resource` has
    /// settled, unless `idempotency` already completed within the dedupe TTL.
    ///
    /// The operation is enqueued when `execute` is called, not when the
    /// returned future is first polled, so call order is execution order for
    /// a resource. A failed operation does not block its successors and leaves
    /// its idempotency key unrecorded so a retry can run. Dropping the returned
    /// future before its turn removes it from the queue.
    pub fn execute<F, Fut, T, E>(
        &self,
        resource: &ResourceKey,
        idempotency: &IdempotencyKey,
        operation: F,
    ) -> impl Future<Output = Result<Execution<T>, E>> + use<F, Fut, T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let slot = self.enqueue(resource, idempotency);
        let inner = Arc::clone(&self.inner);
        let idempotency = idempotency.as_str().to_string();

        async move {
            let Some(mut slot) = slot else {
                return Ok(Execution::Deduped);
            };
            slot.wait_turn().await;

            // A retry queued behind its own original on the same resource.
            if inner.already_done(&idempotency) {
                tracing::debug!(idempotency = %idempotency, "Duplicate settled while queued");
                return Ok(Execution::Deduped);
            }

            let value = operation().await?;
            inner.mark_done(idempotency);
            drop(slot);
            Ok(Execution::Completed(value))
        }
    }

    fn enqueue(&self, resource: &ResourceKey, idempotency: &IdempotencyKey) -> Option<ChainSlot> {
        let now = Instant::now();
        let ttl = self.inner.dedupe_ttl;
        let mut state = lock_unpoisoned(&self.inner.state);

        state.evict_expired(now, ttl);
        if state.seen.contains_key(idempotency.as_str()) {
            tracing::debug!(%resource, %idempotency, "Duplicate operation skipped");
            return None;
        }

        let ticket = state.next_ticket;
        state.next_ticket = state.next_ticket.wrapping_add(1);
        let (done, settled) = oneshot::channel();
        let predecessor = state
            .chains
            .insert(resource.as_str().to_string(), Link { ticket, settled });
        if predecessor.is_none() {
            tracing::trace!(%resource, "Chain started");
        }
        drop(state);

        Some(ChainSlot::new(
            Arc::clone(&self.inner),
            resource.as_str().to_string(),
            ticket,
            predecessor,
            done,
        ))
    }

    /// Whether any operation is queued or running for `resource`.
    #[must_use]
    pub fn is_busy(&self, resource: &ResourceKey) -> bool {
        lock_unpoisoned(&self.inner.state)
            .chains
            .contains_key(resource.as_str())
    }

    /// Number of resources with a live chain.
    #[must_use]
    pub fn active_chains(&self) -> usize {
        lock_unpoisoned(&self.inner.state).chains.len()
    }
}

impl Inner {
    fn already_done(&self, key: &str) -> bool {
        lock_unpoisoned(&self.state).is_fresh(key, Instant::now(), self.dedupe_ttl)
    }

    fn mark_done(&self, key: String) {
        lock_unpoisoned(&self.state).seen.insert(key, Instant::now());
    }
}

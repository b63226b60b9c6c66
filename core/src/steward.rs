use std::future::Future;
use std::sync::Arc;

use steward_arbiter::{Execution, MutationArbiter};
use steward_config::ResolvedConfig;
use steward_guards::{BudgetDecision, BudgetLedger, ConcurrencyGate, WindowedLimiter};
use steward_inbox::{ACK_DIR, AckInbox, SCREENSHOT_DIR, ScreenshotInbox};
use steward_types::{Clock, IdempotencyKey, ResourceKey, SystemClock};

use crate::admission::{Admission, Denial, ProxyPermit};

/// One arbiter, one guard set and both inboxes, wired from a single config.
///
/// Build one per process and share it (it is `Send + Sync`); tests build a
/// fresh one each.
#[derive(Debug)]
pub struct Steward {
    config: ResolvedConfig,
    clock: Arc<dyn Clock>,
    arbiter: MutationArbiter,
    limiter: WindowedLimiter,
    streams: ConcurrencyGate,
    budget: BudgetLedger,
    acks: AckInbox,
    screenshots: ScreenshotInbox,
}

impl Steward {
    #[must_use]
    pub fn new(config: ResolvedConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(config: ResolvedConfig, clock: Arc<dyn Clock>) -> Self {
        let acks = AckInbox::open(&config.inbox.nested(ACK_DIR), Arc::clone(&clock));
        let screenshots =
            ScreenshotInbox::open(&config.inbox.nested(SCREENSHOT_DIR), Arc::clone(&clock));
        tracing::debug!(
            inbox = %config.inbox.root.display(),
            dedupe_ttl_ms = config.dedupe_ttl.as_millis(),
            "Steward ready"
        );
        Self {
            arbiter: MutationArbiter::new(config.dedupe_ttl),
            limiter: WindowedLimiter::new(),
            streams: ConcurrencyGate::new(),
            budget: BudgetLedger::new(),
            acks,
            screenshots,
            clock,
            config,
        }
    }

    /// Run `operation` under the arbiter: serialized per `resource`, skipped if
    /// `idempotency` completed within the dedupe TTL.
    pub fn mutate<F, Fut, T, E>(
        &self,
        resource: &ResourceKey,
        idempotency: &IdempotencyKey,
        operation: F,
    ) -> impl Future<Output = Result<Execution<T>, E>> + use<F, Fut, T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.arbiter.execute(resource, idempotency, operation)
    }

    /// Admit one proxied request for `purpose` on behalf of `identity`.
    ///
    /// Consumes a rate-window slot, then a concurrency slot, both keyed by
    /// `purpose:identity`. A request refused for concurrency still counts
    /// against the rate window.
    pub fn admit_proxy(&self, purpose: &str, identity: &str) -> Admission<ProxyPermit> {
        let key = format!("{purpose}:{identity}");
        let limits = self.config.guards;

        let rate = self.limiter.consume(
            &key,
            limits.rate_limit_per_minute,
            limits.rate_window,
            self.clock.now_ms(),
        );
        if !rate.ok {
            tracing::debug!(key = %key, retry_after_secs = rate.retry_after_secs, "Proxy rate limited");
            return Admission::Denied(Denial::rate(&key, &rate));
        }

        match self.streams.acquire(&key, limits.max_concurrent_streams) {
            Ok(slot) => Admission::Admitted(ProxyPermit::new(slot, rate)),
            Err(denied) => {
                tracing::debug!(key = %key, in_flight = denied.in_flight, "Proxy stream limit reached");
                Admission::Denied(Denial::streams(&key, &denied))
            }
        }
    }

    /// Record `amount` of `metric` usage against the configured ceiling.
    pub fn charge(&self, metric: &str, amount: u64) -> Admission<BudgetDecision> {
        let limits = self.config.guards;
        let decision = self.budget.consume(
            metric,
            amount,
            limits.budget_ceiling,
            limits.budget_window,
            self.clock.now_ms(),
        );
        if decision.ok {
            Admission::Admitted(decision)
        } else {
            Admission::Denied(Denial::budget(metric, &decision))
        }
    }

    #[must_use]
    pub fn acks(&self) -> &AckInbox {
        &self.acks
    }

    #[must_use]
    pub fn screenshots(&self) -> &ScreenshotInbox {
        &self.screenshots
    }

    #[must_use]
    pub fn arbiter(&self) -> &MutationArbiter {
        &self.arbiter
    }

    #[must_use]
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Streams currently admitted for `purpose:identity`.
    #[must_use]
    pub fn streams_in_flight(&self, purpose: &str, identity: &str) -> u32 {
        self.streams.in_flight(&format!("{purpose}:{identity}"))
    }
}

//! Steward: concurrency and delivery assurance for agent-driven canvas edits.
//!
//! [`Steward`] bundles the pieces a request handler needs:
//!
//! - [`Steward::mutate`] serializes writes per resource and drops retried
//!   operations (see `steward-arbiter`);
//! - [`Steward::admit_proxy`] and [`Steward::charge`] apply rate, concurrency
//!   and budget limits (see `steward-guards`);
//! - [`Steward::acks`] and [`Steward::screenshots`] hand records to worker
//!   processes through the durable inbox (see `steward-inbox`).
//!
//! All state is process-local. Instances sharing an inbox directory see each
//! other's records, but not each other's chains or counters.

mod admission;
mod steward;

pub use admission::{Admission, Denial, ProxyPermit, STREAM_RETRY_AFTER_SECS, TOO_MANY_REQUESTS};
pub use steward::Steward;

pub use steward_arbiter::Execution;
pub use steward_config::ResolvedConfig;
pub use steward_guards::BudgetDecision;
pub use steward_inbox::{AckRecord, ScreenshotPayload, SweepReport};
pub use steward_types::{Clock, IdempotencyKey, KeyError, ManualClock, ResourceKey, SystemClock};

//! Mutation arbiter for shared canvas state.
//!
//! Every agent-driven write to a shared resource goes through
//! [`MutationArbiter::execute`] with two keys:
//!
//! - a **resource key** partitioning which writes must serialize: writes on one
//!   key run strictly one at a time in call order, writes on different keys run
//!   concurrently;
//! - an **idempotency key** naming the logical operation: a repeat within the
//!   dedupe TTL is reported as [`Execution::Deduped`] without running.
//!
//! ```text
//! execute(R, K, op) ─┬─ K seen within TTL ──────────────▶ Deduped
//!                    └─ enqueue on chain(R) ─▶ wait turn ─▶ op() ─┬─ Ok  ─▶ record K ─▶ Completed
//!                                                                 └─ Err ─▶ propagate (K not recorded)
//! ```

mod arbiter;
mod chain;

pub use arbiter::{DEFAULT_DEDUPE_TTL, Execution, MutationArbiter};

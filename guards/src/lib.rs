//! Traffic guards: synchronous admission checks run before an expensive or
//! abusable call is made.
//!
//! All three primitives own their tables, never block, never perform IO and
//! never return an error. A denial is an ordinary value the caller turns into
//! backpressure (typically HTTP 429 with `Retry-After`).
//!
//! Tables are process-local. Several instances of the hosting service each
//! enforce their own limits; sharing them would need a coordination service in
//! front of these types.

mod budget;
mod semaphore;
mod window;

pub use budget::{BudgetDecision, BudgetLedger};
pub use semaphore::{ConcurrencyGate, ConcurrencySlot, SlotDenied};
pub use window::{RateDecision, WindowedLimiter};

/// Entry count past which stale rows are swept on the next write.
pub const DEFAULT_GC_THRESHOLD: usize = 10_000;

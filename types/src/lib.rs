//! Core domain types for Steward.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Every other Steward crate builds on these:
//!
//! - **`keys`**: validated resource and idempotency keys
//! - **`clock`**: injectable wall clock in Unix milliseconds
//! - **`segment`**: filesystem-safe segments derived from caller identifiers

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod clock;
mod keys;
mod segment;

pub use clock::{Clock, ManualClock, SystemClock, retry_after_secs};
pub use keys::{IdempotencyKey, KeyError, ResourceKey};
pub use segment::sanitize_segment;

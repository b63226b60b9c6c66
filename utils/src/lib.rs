//! Shared infrastructure utilities for Steward.
//!
//! Cross-cutting helpers that multiple Steward crates need but that don't
//! belong in the domain-pure `steward-types` crate:
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename)
//! - **`prune`**: Interval-throttled sweeps and TTL arithmetic
//! - **`private_dir`**: Owner-only directories for on-disk mirrors
//! - **`sync`**: Poison-tolerant locking for in-memory tables

pub mod atomic_write;
pub mod private_dir;
pub mod prune;
pub mod sync;

pub use atomic_write::{
    AtomicWriteOptions, FileSyncPolicy, PersistMode, atomic_write_with_options, remove_if_exists,
    sync_dir_best_effort,
};
pub use private_dir::ensure_private_dir;
pub use prune::{PruneGate, duration_ms, is_expired};
pub use sync::lock_unpoisoned;

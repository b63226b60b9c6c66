use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a table, recovering from poisoning.
///
/// Every table in Steward re-establishes its invariants before releasing the
/// lock, so a panic elsewhere while holding it leaves consistent data behind.
pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

//! Generic memory-first inbox engine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use steward_types::{Clock, sanitize_segment};
use steward_utils::{
    PruneGate, ensure_private_dir, is_expired, lock_unpoisoned, remove_if_exists,
};

use crate::envelope::{self, DiskRead};
use crate::error::InboxError;
use crate::mirror::{Mirror, MirrorCommand, SweepReport};
use crate::settings::InboxSettings;

/// `(sanitized session, sanitized item)`; memory and disk agree on identity.
type RecordKey = (String, String);

#[derive(Debug, Clone)]
struct Resident<P> {
    payload: P,
    stored_at: u64,
}

/// Records keyed by `(session, item)`, held in memory and mirrored to
/// `<root>/<session>/<item>.json` by a background worker.
///
/// Readers see a record until its retention elapses. [`get`](Self::get) leaves
/// it in place; [`take`](Self::take) removes it from both tiers. A given kind
/// of record is read with one or the other, never both. Disk problems never
/// surface as errors: they are logged and counted in
/// [`mirror_failures`](Self::mirror_failures).
#[derive(Debug)]
pub struct DurableInbox<P> {
    records: Mutex<HashMap<RecordKey, Resident<P>>>,
    retention: Duration,
    clock: Arc<dyn Clock>,
    sweep_gate: PruneGate,
    failures: Arc<AtomicU64>,
    mirror: Mirror,
}

impl<P> DurableInbox<P>
where
    P: Serialize + DeserializeOwned + Clone,
{
    /// Open an inbox, falling back to memory-only operation if the root
    /// directory cannot be prepared.
    pub fn open(settings: &InboxSettings, clock: Arc<dyn Clock>) -> Self {
        if let Err(e) = ensure_private_dir(&settings.root) {
            tracing::warn!(
                root = %settings.root.display(),
                "Inbox directory unavailable, continuing in memory: {e}"
            );
        }
        Self::build(settings, clock)
    }

    /// Like [`open`](Self::open), but fails if the root directory cannot be
    /// created.
    pub fn open_strict(settings: &InboxSettings, clock: Arc<dyn Clock>) -> Result<Self, InboxError> {
        ensure_private_dir(&settings.root).map_err(|source| InboxError::PrepareRoot {
            path: settings.root.clone(),
            source,
        })?;
        Ok(Self::build(settings, clock))
    }

    fn build(settings: &InboxSettings, clock: Arc<dyn Clock>) -> Self {
        let failures = Arc::new(AtomicU64::new(0));
        Self {
            records: Mutex::new(HashMap::new()),
            retention: settings.retention(),
            clock,
            sweep_gate: PruneGate::new(settings.sweep_interval),
            mirror: Mirror::spawn(
                settings.root.clone(),
                settings.retention(),
                Arc::clone(&failures),
            ),
            failures,
        }
    }

    /// Store `payload`, replacing any record under the same key.
    pub fn put(&self, session: &str, item: &str, payload: P) {
        let now = self.clock.now_ms();
        self.maybe_sweep(now);

        let key = record_key(session, item);
        let path = self.path_for(&key);
        let encoded = envelope::encode(&payload, now)
            .inspect_err(|e| {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(session, item, "Inbox record not mirrored, encode failed: {e}");
            })
            .ok();

        // Memory and mirror queue change together, so a concurrent `take` sees
        // either neither or both.
        let mut records = lock_unpoisoned(&self.records);
        if let Some(bytes) = encoded {
            self.mirror.submit(MirrorCommand::Write { path, bytes });
        }
        records.insert(
            key,
            Resident {
                payload,
                stored_at: now,
            },
        );
    }

    /// Look a record up without consuming it. A record found only on disk is
    /// kept in memory afterwards.
    pub fn get(&self, session: &str, item: &str) -> Option<P> {
        let now = self.clock.now_ms();
        self.maybe_sweep(now);
        let key = record_key(session, item);

        {
            let mut records = lock_unpoisoned(&self.records);
            if let Some(resident) = records.get(&key) {
                if !is_expired(resident.stored_at, now, self.retention) {
                    return Some(resident.payload.clone());
                }
                records.remove(&key);
                drop(records);
                self.discard(&key);
                return None;
            }
        }

        let resident = self.hydrate(&key, now)?;
        let payload = resident.payload.clone();
        lock_unpoisoned(&self.records)
            .entry(key)
            .or_insert(resident);
        Some(payload)
    }

    /// Retrieve and remove a record. However many callers race for the same
    /// key, at most one gets the payload. Across processes this holds for
    /// copies read from disk; a copy still held in memory is handed out
    /// without consulting the directory.
    pub fn take(&self, session: &str, item: &str) -> Option<P> {
        let now = self.clock.now_ms();
        self.maybe_sweep(now);
        let key = record_key(session, item);
        let path = self.path_for(&key);

        // Queued under the records lock: a claim lands behind any write whose
        // memory copy it missed, and behind the remove of any copy taken from
        // memory.
        let claimed = {
            let mut records = lock_unpoisoned(&self.records);
            if let Some(resident) = records.remove(&key) {
                self.mirror.submit(MirrorCommand::Remove { path });
                return (!is_expired(resident.stored_at, now, self.retention))
                    .then_some(resident.payload);
            }
            self.mirror.claim(path)
        };

        match claimed.recv() {
            Ok(Ok(Some(claimed))) => self.consume_claimed(&claimed, now),
            Ok(Ok(None)) | Err(_) => None,
            Ok(Err(e)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(session, item, "Inbox record could not be claimed: {e}");
                None
            }
        }
    }

    /// Decode and delete a record this caller claimed from disk.
    fn consume_claimed(&self, claimed: &Path, now: u64) -> Option<P> {
        let read = envelope::read::<P>(claimed);
        if let Err(e) = remove_if_exists(claimed) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(path = %claimed.display(), "Consumed inbox file not removed: {e}");
        }
        match read {
            Ok(DiskRead::Found(found)) if !is_expired(found.stored_at, now, self.retention) => {
                tracing::debug!(path = %claimed.display(), "Consumed inbox record from disk");
                Some(found.payload)
            }
            Ok(DiskRead::Found(_) | DiskRead::Missing) => None,
            Ok(DiskRead::Corrupt(reason)) => {
                tracing::warn!(path = %claimed.display(), "Discarding unreadable inbox record: {reason}");
                None
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(path = %claimed.display(), "Inbox record unreadable: {e}");
                None
            }
        }
    }

    /// Read a record from the mirror. Expired or unreadable files are queued
    /// for deletion and read as absent.
    fn hydrate(&self, key: &RecordKey, now: u64) -> Option<Resident<P>> {
        let path = self.path_for(key);
        match envelope::read::<P>(&path) {
            Ok(DiskRead::Missing) => None,
            Ok(DiskRead::Found(found)) => {
                if is_expired(found.stored_at, now, self.retention) {
                    self.discard(key);
                    return None;
                }
                tracing::debug!(path = %path.display(), "Recovered inbox record from disk");
                Some(Resident {
                    payload: found.payload,
                    stored_at: found.stored_at,
                })
            }
            Ok(DiskRead::Corrupt(reason)) => {
                tracing::warn!(path = %path.display(), "Discarding unreadable inbox record: {reason}");
                self.discard(key);
                None
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(path = %path.display(), "Inbox record unreadable: {e}");
                None
            }
        }
    }

    fn discard(&self, key: &RecordKey) {
        self.mirror.submit(MirrorCommand::Remove {
            path: self.path_for(key),
        });
    }

    fn maybe_sweep(&self, now: u64) {
        if !self.sweep_gate.try_claim(now) {
            return;
        }
        let removed = self.sweep_memory(now);
        if removed > 0 {
            tracing::debug!(removed, "Evicted expired inbox records from memory");
        }
        self.mirror.submit(MirrorCommand::Sweep {
            now_ms: now,
            reply: None,
        });
    }

    fn sweep_memory(&self, now: u64) -> usize {
        let mut records = lock_unpoisoned(&self.records);
        let before = records.len();
        records.retain(|_, r| !is_expired(r.stored_at, now, self.retention));
        before - records.len()
    }

    /// Sweep both tiers immediately, ignoring the throttle, and wait for the
    /// disk half to finish.
    pub fn sweep_now(&self) -> SweepReport {
        let now = self.clock.now_ms();
        let memory_removed = self.sweep_memory(now);
        SweepReport {
            memory_removed,
            ..self.mirror.sweep_blocking(now)
        }
    }

    /// Block until every queued disk operation has been applied.
    pub fn flush(&self) {
        self.mirror.flush();
    }

    /// Disk operations that failed since the inbox was opened.
    #[must_use]
    pub fn mirror_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Records currently held in memory, expired or not.
    #[must_use]
    pub fn resident(&self) -> usize {
        lock_unpoisoned(&self.records).len()
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.mirror.root()
    }

    #[must_use]
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Where the mirror keeps the record for `(session, item)`.
    #[must_use]
    pub fn record_path(&self, session: &str, item: &str) -> PathBuf {
        self.path_for(&record_key(session, item))
    }

    fn path_for(&self, (session, item): &RecordKey) -> PathBuf {
        self.mirror.root().join(session).join(format!("{item}.json"))
    }
}

fn record_key(session: &str, item: &str) -> RecordKey {
    (
        sanitize_segment(session).into_owned(),
        sanitize_segment(item).into_owned(),
    )
}

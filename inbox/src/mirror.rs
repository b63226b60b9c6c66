//! Background disk mirror.
//!
//! Writers never touch the filesystem: they submit [`MirrorCommand`]s to a
//! single worker thread that applies them in submission order, so a write
//! followed by a consuming remove of the same record cannot resurrect the file.
//! The queue is bounded: a submitter waits for room rather than letting a
//! stalled disk grow it without limit. If the worker cannot be started,
//! commands are applied inline, one at a time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread;
use std::time::{Duration, UNIX_EPOCH};

use serde::Serialize;
use steward_utils::{
    AtomicWriteOptions, FileSyncPolicy, PersistMode, atomic_write_with_options,
    ensure_private_dir, is_expired, lock_unpoisoned, remove_if_exists, sync_dir_best_effort,
};
use uuid::Uuid;

use crate::envelope;

/// Commands buffered ahead of the worker before submitters start waiting.
pub(crate) const QUEUE_CAPACITY: usize = 1024;

/// Parents are created by `ensure_private_dir`, never with default permissions.
const RECORD_WRITE: AtomicWriteOptions = AtomicWriteOptions {
    file_sync: FileSyncPolicy::SyncAll,
    mode: PersistMode::SensitiveOwnerOnly,
    create_parents: false,
};

/// What a dual-tier sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub memory_removed: usize,
    pub files_removed: usize,
    pub dirs_removed: usize,
}

impl SweepReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memory_removed == 0 && self.files_removed == 0 && self.dirs_removed == 0
    }
}

pub(crate) enum MirrorCommand {
    Write { path: PathBuf, bytes: Vec<u8> },
    Remove { path: PathBuf },
    /// Move a record aside for a consuming read; replies with the new path.
    Claim {
        path: PathBuf,
        reply: mpsc::Sender<io::Result<Option<PathBuf>>>,
    },
    Sweep {
        now_ms: u64,
        reply: Option<mpsc::Sender<SweepReport>>,
    },
    Flush(mpsc::Sender<()>),
    Shutdown,
}

/// State the worker needs to apply commands.
#[derive(Debug)]
struct Applier {
    root: PathBuf,
    retention: Duration,
    failures: Arc<AtomicU64>,
}

impl Applier {
    fn apply(&self, command: MirrorCommand) {
        match command {
            MirrorCommand::Write { path, bytes } => {
                if let Err(e) = write_record(&path, &bytes) {
                    self.failed("write", &path, &e);
                } else {
                    tracing::trace!(path = %path.display(), "Mirrored inbox record");
                }
            }
            MirrorCommand::Remove { path } => {
                if let Err(e) = remove_if_exists(&path) {
                    self.failed("remove", &path, &e);
                }
            }
            MirrorCommand::Claim { path, reply } => {
                let _ = reply.send(claim_record(&path));
            }
            MirrorCommand::Sweep { now_ms, reply } => {
                let report = sweep_tree(&self.root, now_ms, self.retention);
                if report.files_removed > 0 || report.dirs_removed > 0 {
                    tracing::debug!(
                        root = %self.root.display(),
                        files = report.files_removed,
                        dirs = report.dirs_removed,
                        "Swept expired inbox files"
                    );
                }
                if let Some(reply) = reply {
                    let _ = reply.send(report);
                }
            }
            MirrorCommand::Flush(reply) => {
                let _ = reply.send(());
            }
            MirrorCommand::Shutdown => {}
        }
    }

    fn failed(&self, op: &str, path: &Path, err: &io::Error) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(op, path = %path.display(), "Inbox mirror failed: {err}");
    }
}

fn write_record(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let Some(dir) = path.parent() else {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "record path has no parent"));
    };
    ensure_private_dir(dir)?;
    match atomic_write_with_options(path, bytes, RECORD_WRITE) {
        // Another process's sweep removed the now-empty session dir between our
        // mkdir and the temp file creation.
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            ensure_private_dir(dir)?;
            atomic_write_with_options(path, bytes, RECORD_WRITE)?;
        }
        other => other?,
    }
    sync_dir_best_effort(dir);
    Ok(())
}

/// Rename the record at `path` to a unique sibling so exactly one consumer,
/// in this process or another sharing the directory, ends up holding it.
///
/// The sibling lacks the `.json` extension, so a consumer that dies before
/// deleting it leaves a file the sweep expires by mtime.
fn claim_record(path: &Path) -> io::Result<Option<PathBuf>> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "record path has no file name"));
    };
    let claimed = path.with_file_name(format!(".{name}.taking-{}", Uuid::new_v4()));
    match fs::rename(path, &claimed) {
        Ok(()) => Ok(Some(claimed)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Handle to the mirror worker.
#[derive(Debug)]
pub(crate) struct Mirror {
    tx: Option<SyncSender<MirrorCommand>>,
    worker: Option<thread::JoinHandle<()>>,
    applier: Arc<Applier>,
    /// Serializes inline application when there is no worker.
    inline: Mutex<()>,
}

impl Mirror {
    pub(crate) fn spawn(root: PathBuf, retention: Duration, failures: Arc<AtomicU64>) -> Self {
        Self::with_capacity(root, retention, failures, QUEUE_CAPACITY)
    }

    pub(crate) fn with_capacity(
        root: PathBuf,
        retention: Duration,
        failures: Arc<AtomicU64>,
        capacity: usize,
    ) -> Self {
        let applier = Arc::new(Applier {
            root,
            retention,
            failures,
        });
        let (tx, rx) = mpsc::sync_channel::<MirrorCommand>(capacity);
        let worker_applier = Arc::clone(&applier);
        let spawned = thread::Builder::new()
            .name("steward-inbox-mirror".to_string())
            .spawn(move || {
                while let Ok(command) = rx.recv() {
                    if matches!(command, MirrorCommand::Shutdown) {
                        break;
                    }
                    worker_applier.apply(command);
                }
            });

        match spawned {
            Ok(worker) => Self {
                tx: Some(tx),
                worker: Some(worker),
                applier,
                inline: Mutex::new(()),
            },
            Err(e) => {
                tracing::warn!("Inbox mirror worker unavailable, mirroring inline: {e}");
                Self {
                    tx: None,
                    worker: None,
                    applier,
                    inline: Mutex::new(()),
                }
            }
        }
    }

    /// Queue `command` behind everything submitted before it.
    ///
    /// Blocks while the queue is full. Applying inline on overflow would let the
    /// command overtake queued ones for the same record.
    pub(crate) fn submit(&self, command: MirrorCommand) {
        let command = match &self.tx {
            Some(tx) => match tx.try_send(command) {
                Ok(()) => return,
                Err(TrySendError::Full(command)) => {
                    tracing::debug!("Inbox mirror queue full, waiting for the worker");
                    match tx.send(command) {
                        Ok(()) => return,
                        Err(mpsc::SendError(command)) => command,
                    }
                }
                Err(TrySendError::Disconnected(command)) => command,
            },
            None => command,
        };
        let _serial = lock_unpoisoned(&self.inline);
        self.applier.apply(command);
    }

    /// Queue a claim of the record at `path`. The reply arrives once every
    /// earlier command has been applied.
    pub(crate) fn claim(&self, path: PathBuf) -> mpsc::Receiver<io::Result<Option<PathBuf>>> {
        let (reply, claimed) = mpsc::channel();
        self.submit(MirrorCommand::Claim { path, reply });
        claimed
    }

    /// Block until every command submitted so far has been applied.
    pub(crate) fn flush(&self) {
        let (reply, done) = mpsc::channel();
        self.submit(MirrorCommand::Flush(reply));
        let _ = done.recv();
    }

    /// Sweep the tree and wait for the result.
    pub(crate) fn sweep_blocking(&self, now_ms: u64) -> SweepReport {
        let (reply, done) = mpsc::channel();
        self.submit(MirrorCommand::Sweep {
            now_ms,
            reply: Some(reply),
        });
        done.recv().unwrap_or_default()
    }

    pub(crate) fn root(&self) -> &Path {
        &self.applier.root
    }
}

impl Drop for Mirror {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(MirrorCommand::Shutdown);
        }
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::warn!("Inbox mirror worker panicked");
        }
    }
}

/// Delete expired records under `root`, then session directories left empty.
///
/// `.json` records expire by their `storedAt` stamp. Anything else (temp files
/// from an interrupted write, records too damaged to stamp) expires by mtime.
pub(crate) fn sweep_tree(root: &Path, now_ms: u64, retention: Duration) -> SweepReport {
    let mut report = SweepReport::default();
    let sessions = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
        Err(e) => {
            tracing::warn!(root = %root.display(), "Inbox root unreadable, skipping sweep: {e}");
            return report;
        }
    };

    for session in sessions.flatten() {
        let dir = session.path();
        if !session.file_type().is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let Ok(files) = fs::read_dir(&dir) else {
            continue;
        };

        let mut remaining = 0_usize;
        for file in files.flatten() {
            let path = file.path();
            if is_stale(&path, now_ms, retention) {
                match remove_if_exists(&path) {
                    Ok(true) => report.files_removed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::debug!(path = %path.display(), "Could not remove stale inbox file: {e}");
                        remaining += 1;
                    }
                }
            } else {
                remaining += 1;
            }
        }

        // remove_dir refuses non-empty directories, so a concurrent writer wins.
        if remaining == 0 && fs::remove_dir(&dir).is_ok() {
            report.dirs_removed += 1;
        }
    }
    report
}

fn is_stale(path: &Path, now_ms: u64, retention: Duration) -> bool {
    let is_record = path.extension().is_some_and(|ext| ext == "json");
    if is_record && let Some(stored_at) = envelope::read_stamp(path) {
        return is_expired(stored_at, now_ms, retention);
    }
    modified_ms(path).is_some_and(|mtime| is_expired(mtime, now_ms, retention))
}

fn modified_ms(path: &Path) -> Option<u64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
    u64::try_from(since_epoch.as_millis()).ok()
}

//! Atomic file write helpers.
//!
//! Uses a temp file + rename pattern so a concurrent reader in another process
//! sees either the previous file or the complete new one, never a torn write.
//! Concurrent writers of the same path resolve as last-rename-wins.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistMode {
    /// Allow the file to inherit the default umask.
    #[default]
    Default,
    /// Strictly enforce owner-only read/write permissions (0o600 on Unix).
    SensitiveOwnerOnly,
}

impl PersistMode {
    #[cfg(unix)]
    fn mode(self) -> Option<u32> {
        match self {
            Self::Default => None,
            Self::SensitiveOwnerOnly => Some(0o600),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSyncPolicy {
    SyncAll,
    SkipSync,
}

#[derive(Debug, Clone, Copy)]
pub struct AtomicWriteOptions {
    /// File sync policy for the temp file before persisting.
    pub file_sync: FileSyncPolicy,
    /// Permission policy for the created file.
    pub mode: PersistMode,
    /// Create missing parent directories before writing.
    pub create_parents: bool,
}

impl Default for AtomicWriteOptions {
    fn default() -> Self {
        Self {
            file_sync: FileSyncPolicy::SyncAll,
            mode: PersistMode::SensitiveOwnerOnly,
            create_parents: true,
        }
    }
}

pub fn atomic_write_with_options(
    path: impl AsRef<Path>,
    bytes: &[u8],
    options: AtomicWriteOptions,
) -> io::Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    if options.create_parents {
        fs::create_dir_all(parent)?;
    }

    // Temp file lives next to the target so the rename never crosses filesystems.
    let mut tmp = NamedTempFile::new_in(parent)?;
    #[cfg(unix)]
    if let Some(mode) = options.mode.mode() {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(mode))?;
    }

    tmp.write_all(bytes)?;
    if matches!(options.file_sync, FileSyncPolicy::SyncAll) {
        tmp.as_file().sync_all()?;
    }

    if let Err(err) = tmp.persist(path) {
        if !path.exists() {
            return Err(err.error);
        }
        // Windows refuses rename-over-existing. Replace the target; a reader that
        // races the gap sees absence, which inbox readers already tolerate.
        debug!(path = %path.display(), "Rename over existing file failed, replacing: {}", err.error);
        fs::remove_file(path)?;
        err.file.persist(path).map_err(|e| e.error)?;
    }

    Ok(())
}

/// Remove a file, treating "already gone" as success.
///
/// Another process may have consumed or swept the same file first.
pub fn remove_if_exists(path: impl AsRef<Path>) -> io::Result<bool> {
    match fs::remove_file(path.as_ref()) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Best-effort fsync of a directory so a completed rename survives power loss.
pub fn sync_dir_best_effort(dir: &Path) {
    #[cfg(unix)]
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        debug!(path = %dir.display(), "Directory sync_all failed (best-effort): {e}");
    }
    #[cfg(not(unix))]
    let _ = dir;
}

//! Owner-only directory creation for on-disk mirrors.

use std::fs;
use std::io;
use std::path::Path;

/// Create `path` (and parents) and tighten it to 0700 when we own it.
///
/// Directories owned by someone else (e.g. a shared `/tmp` mount) are left
/// alone: changing them is not ours to do, and failing would take the caller
/// off disk entirely.
pub fn ensure_private_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};
        let metadata = fs::metadata(path)?;

        // SAFETY: getuid has no preconditions and cannot fail.
        let our_uid = unsafe { libc::getuid() };
        if metadata.uid() != our_uid {
            return Ok(());
        }

        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            tracing::debug!(
                path = %path.display(),
                "Directory permissions are too open ({mode:o}); tightening to 0700"
            );
            fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ensure_private_dir;

    #[test]
    fn creates_nested_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        ensure_private_dir(&nested).expect("create");
        assert!(nested.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn tightens_open_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("inbox");
        std::fs::create_dir(&target).expect("mkdir");
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        ensure_private_dir(&target).expect("ensure");

        let mode = std::fs::metadata(&target).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }
}

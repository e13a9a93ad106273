//! Process wide advisory lock preventing overlapping runs.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::runner::RunError;

/// Exclusive lock on the lock file, released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Lock `path` without blocking, creating the file if needed.
    ///
    /// Fails if another process holds the lock.
    pub fn acquire(path: &Path) -> Result<Self, RunError> {
        let lock_error = |source| RunError::Lock {
            path: path.to_path_buf(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(lock_error)?;
        file.try_lock_exclusive().map_err(lock_error)?;

        // informational only, the lock itself is what counts
        file.set_len(0).map_err(lock_error)?;
        writeln!(file, "{}", std::process::id()).map_err(lock_error)?;
        log::debug!(target: "lock", "Acquired lock {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!(target: "lock", "Releasing lock {} failed: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lock_fails_until_released() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.lock");

        let lock = RunLock::acquire(&path).unwrap();
        let pid = std::fs::read_to_string(&path).unwrap();
        assert_eq!(pid.trim(), std::process::id().to_string());

        let err = RunLock::acquire(&path).unwrap_err();
        assert!(matches!(err, RunError::Lock { .. }));

        drop(lock);
        assert!(RunLock::acquire(&path).is_ok());
    }

    #[test]
    fn missing_directory() {
        let err = RunLock::acquire(Path::new("/nonexistent/dir/run.lock")).unwrap_err();
        assert_eq!(err.exit_code(), crate::runner::EXIT_CONFIG);
    }
}

//! Single instance lock
//!
//! Two invocations interleaving port accesses would corrupt each other's
//! index register writes, so the whole run holds an exclusive `flock` on the
//! executable.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use anyhow::{Context, Result};

/// Held for the lifetime of the process; the lock goes away with the file.
pub struct ProcessLock {
    _file: File,
}

impl ProcessLock {
    /// Lock the running executable, waiting for other instances to finish
    pub fn acquire() -> Result<Self> {
        let exe = std::env::current_exe().context("locating the nvram executable")?;
        Self::acquire_path(&exe)
    }

    /// Take an exclusive lock on `path`
    pub fn acquire_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening {} for locking", path.display()))?;

        // SAFETY: the descriptor belongs to `file`, which is alive here.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc == -1 {
            return Err(io::Error::last_os_error())
                .with_context(|| format!("locking {}", path.display()));
        }
        tracing::debug!("holding lock on {}", path.display());

        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn try_lock(path: &Path) -> bool {
        let file = File::open(path).unwrap();
        // SAFETY: valid descriptor for the duration of the call.
        unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) == 0 }
    }

    #[test]
    fn test_lock_is_exclusive_while_held() {
        let target = NamedTempFile::new().unwrap();

        let lock = ProcessLock::acquire_path(target.path()).unwrap();
        assert!(!try_lock(target.path()));

        drop(lock);
        assert!(try_lock(target.path()));
    }

    #[test]
    fn test_lock_missing_file() {
        assert!(ProcessLock::acquire_path(Path::new("/nonexistent/nvram")).is_err());
    }
}

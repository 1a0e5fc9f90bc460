//! Advisory per-file lock that keeps two sessions off the same vault.
//!
//! On Unix this is `flock(LOCK_EX | LOCK_NB)` on a descriptor of the vault
//! file itself, separate from the `fcntl` locks SQLite takes. The lock
//! goes away with the descriptor. Other platforms get no cross-process
//! exclusion.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use crate::errors::{Result, VaultedError};

/// Held for the lifetime of an open session.
#[derive(Debug)]
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Take the lock, or fail with `Busy` if another session holds it.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        if try_flock_exclusive(&file)? {
            Ok(Self { file })
        } else {
            Err(VaultedError::Busy(path.to_path_buf()))
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        unlock(&self.file);
    }
}

/// Returns `Ok(false)` when another descriptor already holds the lock.
fn try_flock_exclusive(file: &File) -> io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: `file` owns a valid descriptor for the duration of the call.
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if result == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK)
        {
            return Ok(false);
        }
        Err(err)
    }
    #[cfg(not(unix))]
    {
        let _ = file;
        Ok(true)
    }
}

fn unlock(file: &File) {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: see `try_flock_exclusive`. Failure is harmless; the
        // lock is released when the descriptor closes right after.
        unsafe {
            libc::flock(file.as_raw_fd(), libc::LOCK_UN);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = file;
    }
}

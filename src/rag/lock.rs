//! File-based lock guarding writes to a persisted index directory.

use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;
use tracing::warn;

use crate::error::{Error, Result};

pub const LOCK_FILE: &str = ".lock";

/// Exclusive lock on an index directory, released on drop.
///
/// The lock file is left in place after release; removing it would let two
/// writers lock different inodes.
pub struct IndexLock {
    lock_file: Option<File>,
}

impl IndexLock {
    /// Acquire an exclusive lock on `dir`. The directory must exist.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                lock_file: Some(lock_file),
            }),
            Err(_) => {
                warn!(
                    "Index at {} is being written by another process",
                    dir.display()
                );
                Err(Error::IndexLocked)
            }
        }
    }

    /// Release the lock manually
    pub fn release(&mut self) {
        if let Some(file) = self.lock_file.take() {
            let _ = file.unlock();
        }
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        self.release();
    }
}

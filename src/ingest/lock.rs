//! Run lock: a zero-byte marker file that keeps ingestion runs on one host
//! from overlapping.
//!
//! The marker is created with `create_new`, so acquisition is atomic and never
//! blocks. The returned guard removes it when dropped. A process killed
//! between acquire and release leaves the marker behind; it must be removed by
//! an operator. Contention logs the marker's age to make that case visible.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};

/// Marker file name inside the lock directory.
pub const LOCK_FILE_NAME: &str = "ingest.lock";

/// Exclusivity marker for ingestion runs.
#[derive(Debug, Clone)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn new(lock_directory: impl AsRef<Path>) -> Self {
        Self {
            path: lock_directory.as_ref().join(LOCK_FILE_NAME),
        }
    }

    /// Path of the marker file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try to take the lock.
    ///
    /// Returns `Ok(None)` when another run holds it. Errors are filesystem
    /// faults (unwritable lock directory and the like).
    pub fn acquire(&self) -> io::Result<Option<RunLockGuard>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(_) => {
                debug!(path = %self.path.display(), "run lock acquired");
                Ok(Some(RunLockGuard {
                    path: self.path.clone(),
                }))
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let age_secs = marker_age(&self.path).map(|age| age.as_secs());
                info!(
                    path = %self.path.display(),
                    age_secs = ?age_secs,
                    "another ingestion run holds the lock, skipping"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn marker_age(path: &Path) -> Option<std::time::Duration> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

/// Held run lock. Dropping it removes the marker.
#[derive(Debug)]
pub struct RunLockGuard {
    path: PathBuf,
}

impl RunLockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "run lock released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "run lock marker already gone on release");
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove run lock marker");
            }
        }
    }
}

//! Quarantine: keeps staged files whose zone failed to ingest.
//!
//! Files land as `{label}-{file name}` in the quarantine directory, where the
//! label is the run's event name, or `aborted` for leftovers of a failed run.
//! An operator can move them back into the cache directory to retry them.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::warn;

use super::staging::move_file;

/// Label for files left over by a run that aborted.
pub const ABORTED_LABEL: &str = "aborted";

#[derive(Debug, Clone)]
pub struct Quarantine {
    directory: PathBuf,
}

impl Quarantine {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Move `path` into quarantine and return where it went.
    ///
    /// Returns `Ok(None)` if the file no longer exists.
    pub async fn hold(&self, label: &str, path: &Path, reason: &str) -> io::Result<Option<PathBuf>> {
        let Some(file_name) = path.file_name() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a file path: {}", path.display()),
            ));
        };

        fs::create_dir_all(&self.directory).await?;

        let base = format!("{}-{}", label, file_name.to_string_lossy());
        let mut target = self.directory.join(&base);
        let mut n = 1;
        while fs::try_exists(&target).await? {
            target = self.directory.join(format!("{}.{}", base, n));
            n += 1;
        }

        match move_file(path, &target).await {
            Ok(()) => {
                warn!(
                    file = %path.display(),
                    quarantined = %target.display(),
                    reason,
                    "quarantined snapshot file"
                );
                Ok(Some(target))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_hold_moves_with_label() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("siteA.yaml");
        std::fs::write(&source, b"misc: {}").unwrap();
        let quarantine = Quarantine::new(dir.path().join("q"));

        let held = quarantine
            .hold("abc123", &source, "bad data")
            .await
            .unwrap()
            .expect("file should move");

        assert_eq!(held, quarantine.directory().join("abc123-siteA.yaml"));
        assert!(!source.exists());
        assert_eq!(std::fs::read(&held).unwrap(), b"misc: {}");
    }

    #[tokio::test]
    async fn test_hold_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let quarantine = Quarantine::new(dir.path().join("q"));

        let mut held = Vec::new();
        for body in ["one", "two"] {
            let source = dir.path().join("siteA.yaml");
            std::fs::write(&source, body).unwrap();
            held.push(quarantine.hold(ABORTED_LABEL, &source, "x").await.unwrap().unwrap());
        }

        assert_ne!(held[0], held[1]);
        assert_eq!(std::fs::read_to_string(&held[0]).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(&held[1]).unwrap(), "two");
    }

    #[tokio::test]
    async fn test_hold_missing_file() {
        let dir = TempDir::new().unwrap();
        let quarantine = Quarantine::new(dir.path());

        let held = quarantine
            .hold(ABORTED_LABEL, &dir.path().join("gone.yaml"), "x")
            .await
            .unwrap();
        assert!(held.is_none());
    }
}

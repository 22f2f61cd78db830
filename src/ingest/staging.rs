//! Staging area: moves snapshot files out of the shared cache directory into a
//! private working directory owned by one run.
//!
//! ```text
//! {ingest_directory}/
//!   ingest-XXXXXX/      <- deleted with everything in it when the run ends
//!     siteA.yaml
//!     siteB.yaml
//! ```
//!
//! Files are moved, not copied, so the poller never sees a file half-consumed
//! and files written after staging starts wait for the next run.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::snapshot::is_snapshot_file;

/// Prefix of per-run working directory names.
const STAGING_PREFIX: &str = "ingest-";

/// Staging failures. All of them are fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Failed to create staging directory under '{path}': {source}")]
    Create { path: PathBuf, source: io::Error },

    #[error("Failed to list cache directory '{path}': {source}")]
    List { path: PathBuf, source: io::Error },

    #[error("Failed to stage '{path}': {source}")]
    Move { path: PathBuf, source: io::Error },
}

/// A run's private working directory and the files moved into it.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
    files: Vec<PathBuf>,
}

impl StagingArea {
    /// Create a working directory under `ingest_directory` and move every
    /// eligible file from `cache_directory` into it.
    ///
    /// A missing cache directory stages nothing.
    pub async fn stage(
        cache_directory: &Path,
        ingest_directory: &Path,
    ) -> Result<Self, StagingError> {
        let create_err = |source| StagingError::Create {
            path: ingest_directory.to_path_buf(),
            source,
        };
        fs::create_dir_all(ingest_directory)
            .await
            .map_err(create_err)?;
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(ingest_directory)
            .map_err(create_err)?;

        let mut files = stage_files(cache_directory, dir.path()).await?;
        files.sort();
        info!(
            staging = %dir.path().display(),
            files = files.len(),
            "staged snapshot files"
        );

        Ok(Self { dir, files })
    }

    /// The working directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Staged files, sorted by name.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Move every eligible file from `cache_directory` into `target`. If any step
/// fails, files already moved go back to the cache before the error returns.
async fn stage_files(cache_directory: &Path, target: &Path) -> Result<Vec<PathBuf>, StagingError> {
    let mut files = Vec::new();
    match move_eligible(cache_directory, target, &mut files).await {
        Ok(()) => Ok(files),
        Err(e) => {
            unstage(&files, cache_directory).await;
            Err(e)
        }
    }
}

async fn move_eligible(
    cache_directory: &Path,
    target: &Path,
    files: &mut Vec<PathBuf>,
) -> Result<(), StagingError> {
    let list_err = |source| StagingError::List {
        path: cache_directory.to_path_buf(),
        source,
    };
    let mut entries = match fs::read_dir(cache_directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(cache = %cache_directory.display(), "cache directory missing, nothing to stage");
            return Ok(());
        }
        Err(e) => return Err(list_err(e)),
    };

    while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
        let source = entry.path();
        let file_type = entry.file_type().await.map_err(list_err)?;
        if !file_type.is_file() || !is_snapshot_file(&source) {
            continue;
        }

        let staged = target.join(entry.file_name());
        match move_file(&source, &staged).await {
            Ok(()) => files.push(staged),
            // Vanished between listing and moving; the poller owns the cache.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(file = %source.display(), "cached file disappeared before staging");
            }
            Err(e) => return Err(StagingError::Move { path: source, source: e }),
        }
    }
    Ok(())
}

/// Return staged files to the cache. A newer cache file of the same name is
/// left in place.
async fn unstage(files: &[PathBuf], cache_directory: &Path) {
    for staged in files {
        let Some(name) = staged.file_name() else { continue };
        let restored = cache_directory.join(name);
        match fs::try_exists(&restored).await {
            Ok(false) => {}
            Ok(true) => {
                warn!(file = %restored.display(), "newer snapshot in cache, dropping staged copy");
                continue;
            }
            Err(e) => {
                error!(file = %staged.display(), error = %e, "failed to return staged file to cache");
                continue;
            }
        }
        if let Err(e) = move_file(staged, &restored).await {
            error!(file = %staged.display(), error = %e, "failed to return staged file to cache");
        }
    }
    if !files.is_empty() {
        info!(files = files.len(), "staging aborted, returned files to cache");
    }
}

/// Move a file, falling back to copy and remove when `rename` cannot cross
/// filesystems.
pub(crate) async fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(source, target).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(e) => {
            debug!(
                source = %source.display(),
                target = %target.display(),
                error = %e,
                "rename failed, copying instead"
            );
            fs::copy(source, target).await?;
            fs::remove_file(source).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "misc:\n  zone: z\n").unwrap();
    }

    #[tokio::test]
    async fn test_stage_moves_eligible_files_only() {
        let root = TempDir::new().unwrap();
        let cache = root.path().join("cache");
        std::fs::create_dir_all(cache.join("nested.yaml")).unwrap();
        write(&cache, "siteB.yaml");
        write(&cache, "siteA.YAML");
        write(&cache, "notes.txt");
        write(&cache, "siteC.yaml.part");

        let staging = StagingArea::stage(&cache, &root.path().join("ingest"))
            .await
            .expect("stage failed");

        let names: Vec<String> = staging
            .files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["siteA.YAML", "siteB.yaml"]);
        assert!(staging.files().iter().all(|p| p.starts_with(staging.path())));

        // Moved, not copied; ineligible entries stay put.
        assert!(!cache.join("siteA.YAML").exists());
        assert!(!cache.join("siteB.yaml").exists());
        assert!(cache.join("notes.txt").exists());
        assert!(cache.join("siteC.yaml.part").exists());
        assert!(cache.join("nested.yaml").is_dir());
    }

    #[tokio::test]
    async fn test_staging_directory_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let cache = root.path().join("cache");
        std::fs::create_dir_all(&cache).unwrap();
        write(&cache, "siteA.yaml");

        let staging = StagingArea::stage(&cache, &root.path().join("ingest"))
            .await
            .unwrap();
        let path = staging.path().to_path_buf();
        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(STAGING_PREFIX));

        drop(staging);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_missing_cache_directory_stages_nothing() {
        let root = TempDir::new().unwrap();
        let staging = StagingArea::stage(&root.path().join("absent"), root.path())
            .await
            .unwrap();
        assert!(staging.is_empty());
    }

    #[tokio::test]
    async fn test_uncreatable_ingest_directory_is_fatal() {
        let root = TempDir::new().unwrap();
        let blocker = root.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let result = StagingArea::stage(root.path(), &blocker.join("ingest")).await;
        assert!(matches!(result, Err(StagingError::Create { .. })));
    }

    #[tokio::test]
    async fn test_failed_move_returns_staged_files_to_cache() {
        let root = TempDir::new().unwrap();
        let cache = root.path().join("cache");
        let target = root.path().join("staging");
        std::fs::create_dir_all(&cache).unwrap();
        for name in ["s01.yaml", "s02.yaml", "s03.yaml", "s04.yaml", "s05.yaml"] {
            write(&cache, name);
        }
        // A directory in the way makes this one file impossible to stage.
        std::fs::create_dir_all(target.join("s03.yaml").join("x")).unwrap();

        let err = stage_files(&cache, &target).await.unwrap_err();
        assert!(matches!(err, StagingError::Move { ref path, .. } if path.ends_with("s03.yaml")));

        let mut left: Vec<String> = std::fs::read_dir(&cache)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        left.sort();
        assert_eq!(left, vec!["s01.yaml", "s02.yaml", "s03.yaml", "s04.yaml", "s05.yaml"]);
        assert_eq!(std::fs::read_dir(&target).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_unstage_keeps_newer_cache_file() {
        let root = TempDir::new().unwrap();
        let cache = root.path().join("cache");
        std::fs::create_dir_all(&cache).unwrap();
        let staged = root.path().join("siteA.yaml");
        std::fs::write(&staged, "old").unwrap();
        std::fs::write(cache.join("siteA.yaml"), "new").unwrap();

        unstage(&[staged], &cache).await;

        assert_eq!(std::fs::read_to_string(cache.join("siteA.yaml")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_move_file() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("a.yaml");
        let target = root.path().join("b.yaml");
        std::fs::write(&source, b"x").unwrap();

        move_file(&source, &target).await.unwrap();
        assert!(!source.exists());
        assert_eq!(std::fs::read(&target).unwrap(), b"x");

        let err = move_file(&source, &target).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}

//! Ingestion engine configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// How the dispatch phase runs the per-zone units of work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Units run one after another on the calling task. Deterministic; used
    /// by tests.
    Sequential,
    /// Units run on a fixed-size pool of worker tasks.
    #[default]
    Parallel,
}

/// Directories and pool sizing for an ingestion run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Where the poller drops snapshot files.
    pub cache_directory: PathBuf,
    /// Root under which each run creates its private staging directory.
    pub ingest_directory: PathBuf,
    /// Where the run lock marker lives.
    pub lock_directory: PathBuf,
    /// Where files of zones that failed to ingest are moved.
    pub quarantine_directory: PathBuf,
    /// Worker pool size for parallel dispatch.
    pub workers: usize,
    /// Dispatch mode.
    pub mode: DispatchMode,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            cache_directory: PathBuf::from("./var/cache"),
            ingest_directory: PathBuf::from("./var/ingest"),
            lock_directory: PathBuf::from("./var/lock"),
            quarantine_directory: PathBuf::from("./var/quarantine"),
            workers: 4,
            mode: DispatchMode::Parallel,
        }
    }
}

impl IngestConfig {
    /// Worker count, never less than one.
    pub fn pool_size(&self) -> usize {
        self.workers.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_config_default() {
        let config = IngestConfig::default();
        assert_eq!(config.cache_directory, PathBuf::from("./var/cache"));
        assert_eq!(config.workers, 4);
        assert_eq!(config.mode, DispatchMode::Parallel);
    }

    #[test]
    fn test_pool_size_clamped() {
        let config = IngestConfig {
            workers: 0,
            ..Default::default()
        };
        assert_eq!(config.pool_size(), 1);
    }
}

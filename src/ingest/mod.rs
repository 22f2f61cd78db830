//! Ingestion engine.
//!
//! One run:
//!
//! ```text
//! RunLock -> StagingArea -> EventAllocator -> ZoneResolver x N
//!         -> Dispatcher -> RootCutover -> lock released
//! ```
//!
//! Everything except dispatch runs sequentially on the calling task. The
//! root is only cut over once dispatch has drained, so readers see either the
//! previous event or the fully ingested new one.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::interfaces::{Event, StoreError};
use crate::storage::Stores;
use crate::topology::TopologyProcessor;

pub mod cutover;
pub mod dispatch;
pub mod event;
pub mod lock;
pub mod quarantine;
pub mod staging;
pub mod zone;

pub use cutover::{Cutover, RootCutover};
pub use dispatch::{DispatchReport, Dispatcher, FailedUnit};
pub use event::{EventAllocator, NameSource, RandomNameSource, MAX_NAME_ATTEMPTS};
pub use lock::{RunLock, RunLockGuard, LOCK_FILE_NAME};
pub use quarantine::Quarantine;
pub use staging::{StagingArea, StagingError};
pub use zone::{ResolveError, UnitOfWork, ZoneResolver};

/// Fatal run errors. The lock is always released before these surface.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Failed to acquire run lock: {0}")]
    Lock(#[source] io::Error),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No unused event name after {attempts} attempts")]
    EventNameExhausted { attempts: usize },

    #[error("Failed to quarantine '{path}': {source}")]
    Quarantine { path: PathBuf, source: io::Error },

    #[error("Row store unavailable while processing zones ({failed} failed)")]
    ZoneProcessing { failed: usize },
}

/// Counts for a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub event: Event,
    /// Distinct zones resolved.
    pub zones: usize,
    /// Units the processor finished.
    pub processed: usize,
    /// Files that failed to resolve or process.
    pub failed: usize,
    /// Failed files moved to quarantine.
    pub quarantined: usize,
    /// Whether the root now points at `event`.
    pub cut_over: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run holds the lock; nothing was touched.
    Contended,
    /// Nothing was staged; no event was allocated.
    Empty,
    Completed(RunSummary),
}

/// The ingestion engine.
pub struct Ingest {
    config: IngestConfig,
    lock: RunLock,
    allocator: EventAllocator,
    resolver: ZoneResolver,
    dispatcher: Dispatcher,
    cutover: RootCutover,
    quarantine: Quarantine,
}

impl Ingest {
    pub fn new(config: IngestConfig, stores: Stores, processor: Arc<dyn TopologyProcessor>) -> Self {
        Self {
            lock: RunLock::new(&config.lock_directory),
            allocator: EventAllocator::new(stores.events.clone()),
            resolver: ZoneResolver::new(stores.zones.clone()),
            dispatcher: Dispatcher::new(processor, config.mode, config.pool_size()),
            cutover: RootCutover::new(stores.roots.clone()),
            quarantine: Quarantine::new(&config.quarantine_directory),
            config,
        }
    }

    /// Replace the event allocator, e.g. to use a different name source.
    pub fn with_allocator(mut self, allocator: EventAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    /// Perform one ingestion run.
    pub async fn process(&self) -> Result<RunOutcome, IngestError> {
        let Some(_lock) = self.lock.acquire().map_err(IngestError::Lock)? else {
            return Ok(RunOutcome::Contended);
        };

        let staging =
            StagingArea::stage(&self.config.cache_directory, &self.config.ingest_directory)
                .await?;

        if staging.is_empty() {
            info!(cache = %self.config.cache_directory.display(), "no snapshot files to ingest");
            return Ok(RunOutcome::Empty);
        }

        match self.run(&staging).await {
            Ok(summary) => {
                info!(
                    event = %summary.event.name,
                    zones = summary.zones,
                    processed = summary.processed,
                    failed = summary.failed,
                    quarantined = summary.quarantined,
                    cut_over = summary.cut_over,
                    "ingestion run completed"
                );
                Ok(RunOutcome::Completed(summary))
            }
            Err(e) => {
                error!(error = %e, "ingestion run aborted, root not cut over");
                self.quarantine_remaining(&staging).await;
                Err(e)
            }
        }
    }

    async fn run(&self, staging: &StagingArea) -> Result<RunSummary, IngestError> {
        let event = self.allocator.allocate().await?;

        let mut failed = 0;
        let mut quarantined = 0;
        let mut units = Vec::with_capacity(staging.files().len());

        // Zones are created before any worker starts.
        for path in staging.files() {
            match self.resolver.resolve(&event, path).await {
                Ok(unit) => units.push(unit),
                Err(ResolveError::Store(e)) => return Err(e.into()),
                Err(ResolveError::Snapshot(e)) => {
                    warn!(file = %path.display(), error = %e, "failed to resolve zone");
                    failed += 1;
                    if self.hold(&event.name, path, &e.to_string()).await? {
                        quarantined += 1;
                    }
                }
            }
        }

        let zones = units.iter().map(|u| u.zone_id).collect::<BTreeSet<_>>().len();
        let report = self.dispatcher.dispatch(units).await;
        failed += report.failed.len();

        if report.store_outage() {
            return Err(IngestError::ZoneProcessing {
                failed: report.failed.len(),
            });
        }

        for unit in &report.failed {
            if self.hold(&event.name, &unit.path, &unit.error).await? {
                quarantined += 1;
            }
        }

        let cut_over = matches!(
            self.cutover.cutover(&event).await?,
            Cutover::Switched { .. }
        );

        Ok(RunSummary {
            event,
            zones,
            processed: report.processed,
            failed,
            quarantined,
            cut_over,
        })
    }

    async fn hold(&self, label: &str, path: &Path, reason: &str) -> Result<bool, IngestError> {
        self.quarantine
            .hold(label, path, reason)
            .await
            .map(|held| held.is_some())
            .map_err(|source| IngestError::Quarantine {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Keep whatever is still staged after a fatal error so it is not lost
    /// with the staging directory.
    async fn quarantine_remaining(&self, staging: &StagingArea) {
        for path in staging.files() {
            if let Err(e) = self
                .quarantine
                .hold(quarantine::ABORTED_LABEL, path, "run aborted")
                .await
            {
                error!(file = %path.display(), error = %e, "failed to quarantine staged file");
            }
        }
    }
}

//! topograph-ingest: one ingestion run per invocation
//!
//! Meant to be started on a schedule. A run that finds another run holding
//! the lock, or nothing to ingest, exits successfully.
//!
//! ## Architecture
//! ```text
//! [poller] -> cache_directory/*.yaml -> [topograph-ingest] -> [SQLite]
//!                                              |
//!                                              v
//!                                   root.current_event_id
//! ```
//!
//! ## Configuration
//! - `--config <path>` or TOPOGRAPH_CONFIG: YAML configuration file
//! - TOPOGRAPH__INGEST__WORKERS, TOPOGRAPH__STORAGE__PATH, ...: overrides
//! - TOPOGRAPH_LOG: tracing filter (default: info)

use std::sync::Arc;

use tracing::{error, info};

use topograph::config::Config;
use topograph::ingest::{Ingest, RunOutcome};
use topograph::storage::init_storage;
use topograph::topology::StoreTopologyProcessor;
use topograph::utils::bootstrap::{init_tracing, parse_config_path};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = parse_config_path();
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        cache = %config.ingest.cache_directory.display(),
        workers = config.ingest.pool_size(),
        mode = ?config.ingest.mode,
        "starting topograph-ingest"
    );

    let stores = init_storage(&config.storage).await.map_err(|e| {
        error!(error = %e, "failed to open row store");
        e
    })?;

    let processor = Arc::new(StoreTopologyProcessor::new(stores.topology.clone()));
    let ingest = Ingest::new(config.ingest, stores, processor);

    match ingest.process().await? {
        RunOutcome::Contended => info!("ingestion already running, nothing to do"),
        RunOutcome::Empty => info!("nothing to ingest"),
        RunOutcome::Completed(summary) if summary.failed > 0 => info!(
            event = %summary.event.name,
            failed = summary.failed,
            quarantined = summary.quarantined,
            "run completed with quarantined zones"
        ),
        RunOutcome::Completed(_) => {}
    }

    Ok(())
}

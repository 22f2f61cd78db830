//! Storage implementations.

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::interfaces::{
    EventStore, Result, RootStore, TopologySnapshot, TopologyStore, ZoneStore, ROOT_ID,
};

pub mod schema;
pub mod sqlite;

pub use sqlite::{SqliteEventStore, SqliteRootStore, SqliteTopologyStore, SqliteZoneStore};

/// Handles to every row store the engine talks to.
#[derive(Clone)]
pub struct Stores {
    pub events: Arc<dyn EventStore>,
    pub zones: Arc<dyn ZoneStore>,
    pub roots: Arc<dyn RootStore>,
    pub topology: Arc<dyn TopologyStore>,
}

impl Stores {
    /// Build SQLite-backed stores on an existing pool and create their tables.
    pub async fn sqlite(pool: SqlitePool) -> Result<Self> {
        let events = SqliteEventStore::new(pool.clone());
        events.init().await?;

        let roots = SqliteRootStore::new(pool.clone());
        roots.init().await?;

        let zones = SqliteZoneStore::new(pool.clone());
        zones.init().await?;

        let topology = SqliteTopologyStore::new(pool);
        topology.init().await?;

        Ok(Self {
            events: Arc::new(events),
            zones: Arc::new(zones),
            roots: Arc::new(roots),
            topology: Arc::new(topology),
        })
    }
}

/// Open the configured row store and initialize its schema.
pub async fn init_storage(config: &StorageConfig) -> Result<Stores> {
    info!(storage = ?config.storage_type, path = %config.path, "opening row store");

    match config.storage_type {
        StorageType::Sqlite => {
            if let Some(parent) = std::path::Path::new(&config.path).parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| crate::interfaces::StoreError::Unavailable(e.to_string()))?;
            }

            let opts = SqliteConnectOptions::new()
                .filename(&config.path)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
                .foreign_keys(true)
                .create_if_missing(true);

            let pool = SqlitePoolOptions::new()
                .max_connections(config.max_connections.max(1))
                .connect_with(opts)
                .await?;

            Stores::sqlite(pool).await
        }
    }
}

/// Topology of the event the root currently points at, or `None` before the
/// root has been bootstrapped.
pub async fn current_topology(stores: &Stores) -> Result<Option<(i64, TopologySnapshot)>> {
    let Some(root) = stores.roots.idx_exists(ROOT_ID).await? else {
        return Ok(None);
    };

    let snapshot = stores.topology.snapshot(root.current_event_id).await?;
    Ok(Some((root.current_event_id, snapshot)))
}

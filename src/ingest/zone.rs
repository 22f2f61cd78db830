//! Zone resolution: map a staged file to its zone row for the run's event.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::interfaces::{Event, NewZone, StoreError, Zone, ZoneStore};
use crate::snapshot::{Snapshot, SnapshotError};

/// One zone's resolved id paired with its parsed payload.
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    pub zone_id: i64,
    pub zone_name: String,
    /// Staged file the payload came from.
    pub path: PathBuf,
    pub snapshot: Snapshot,
}

/// Resolution failures. `Snapshot` is a bad file; `Store` is a store fault.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ZoneResolver {
    zones: Arc<dyn ZoneStore>,
}

impl ZoneResolver {
    pub fn new(zones: Arc<dyn ZoneStore>) -> Self {
        Self { zones }
    }

    /// Parse `path`, then find or create its zone under `event`.
    pub async fn resolve(&self, event: &Event, path: &Path) -> Result<UnitOfWork, ResolveError> {
        let snapshot = Snapshot::read(path).await?;
        let zone_name = snapshot.zone_name()?.to_string();
        let zone = self.zone(event.id, &zone_name).await?;

        debug!(
            zone_id = zone.id,
            zone = %zone_name,
            file = %path.display(),
            "resolved zone"
        );

        Ok(UnitOfWork {
            zone_id: zone.id,
            zone_name,
            path: path.to_path_buf(),
            snapshot,
        })
    }

    /// Find the zone row for `(event_id, name)`, creating it if absent.
    ///
    /// The insert does not return an id, so the row is always re-read. A
    /// second resolution of the same name finds the first one's row.
    pub async fn zone(&self, event_id: i64, name: &str) -> Result<Zone, StoreError> {
        if let Some(zone) = self.zones.exists(event_id, name).await? {
            return Ok(zone);
        }

        self.zones.insert(&NewZone::named(event_id, name)).await?;

        self.zones
            .exists(event_id, name)
            .await?
            .ok_or_else(|| StoreError::Corrupt {
                table: "zones",
                reason: format!("zone '{}' for event {} missing after insert", name, event_id),
            })
    }
}

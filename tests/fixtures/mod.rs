//! Shared fixtures for ingestion integration tests.
//!
//! Each harness owns a temp directory holding the cache, ingest, lock and
//! quarantine directories plus a file-backed SQLite store whose root row is
//! bootstrapped to a `bootstrap` event.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use topograph::config::{DispatchMode, IngestConfig, StorageConfig};
use topograph::ingest::Ingest;
use topograph::interfaces::{Event, Root, ROOT_ID};
use topograph::storage::{init_storage, Stores};
use topograph::topology::{StoreTopologyProcessor, TopologyProcessor};

pub struct Harness {
    pub dir: TempDir,
    pub stores: Stores,
    pub config: IngestConfig,
    pub bootstrap: Event,
}

impl Harness {
    pub async fn new(mode: DispatchMode) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let storage = StorageConfig {
            path: dir.path().join("topograph.db").to_string_lossy().to_string(),
            ..Default::default()
        };
        let stores = init_storage(&storage).await.expect("init storage");

        stores.events.insert("bootstrap", true).await.unwrap();
        let bootstrap = stores.events.exists("bootstrap").await.unwrap().unwrap();
        stores
            .roots
            .insert(&Root {
                id: ROOT_ID,
                current_event_id: bootstrap.id,
                name: "main".into(),
                enabled: true,
            })
            .await
            .unwrap();

        let config = IngestConfig {
            cache_directory: dir.path().join("cache"),
            ingest_directory: dir.path().join("ingest"),
            lock_directory: dir.path().join("lock"),
            quarantine_directory: dir.path().join("quarantine"),
            workers: 3,
            mode,
        };
        std::fs::create_dir_all(&config.cache_directory).unwrap();

        Self {
            dir,
            stores,
            config,
            bootstrap,
        }
    }

    pub fn ingest(&self) -> Ingest {
        self.ingest_with(Arc::new(StoreTopologyProcessor::new(
            self.stores.topology.clone(),
        )))
    }

    pub fn ingest_with(&self, processor: Arc<dyn TopologyProcessor>) -> Ingest {
        Ingest::new(self.config.clone(), self.stores.clone(), processor)
    }

    pub fn cache(&self) -> &Path {
        &self.config.cache_directory
    }

    /// Write a snapshot for one switch into the cache directory.
    pub fn write_snapshot(&self, file: &str, zone: &str, host: &str) -> PathBuf {
        let path = self.cache().join(file);
        std::fs::write(&path, switch_yaml(zone, host)).unwrap();
        path
    }

    pub fn write_raw(&self, file: &str, body: &str) -> PathBuf {
        let path = self.cache().join(file);
        std::fs::write(&path, body).unwrap();
        path
    }

    pub async fn current_event_id(&self) -> i64 {
        self.stores
            .roots
            .idx_exists(ROOT_ID)
            .await
            .unwrap()
            .expect("root row")
            .current_event_id
    }

    pub fn quarantined(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.config.quarantine_directory) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

/// A two-port switch: an access port with a MAC and a trunk carrying two
/// VLANs, one of them only known from the port.
pub fn switch_yaml(zone: &str, host: &str) -> String {
    format!(
        r#"
misc:
  zone: {zone}
  host: {host}
  timestamp: 1700000000
system:
  sysName: {host}
  sysDescr: test switch
  sysObjectID: .1.3.6.1.4.1.9.1.1
  sysUpTime: 1234
layer1:
  1:
    ifName: Gi1/0/1
    ifAlias: desk
    ifType: 6
    ifSpeed: 1000000000
    ifAdminStatus: 1
    ifOperStatus: 1
    nativevlan: 10
    vlans: [10]
    macs: ["00:11:22:33:44:55", "AA-BB-CC-DD-EE-FF"]
  2:
    ifName: Gi1/0/48
    ifType: 6
    ifAdminStatus: 1
    ifOperStatus: 1
    trunk: true
    vlans: [10, 20]
  100:
    ifName: Vlan10
    ifType: 6
layer2:
  vlans:
    10:
      name: users
      state: 1
"#,
        zone = zone,
        host = host
    )
}

//! Polled snapshot file format.
//!
//! One YAML document per device poll, dropped by the poller into the cache
//! directory:
//!
//! ```yaml
//! misc:
//!   zone: siteA
//!   host: sw1.example.org
//!   timestamp: 1700000000
//! system:
//!   sysName: sw1
//!   sysObjectID: .1.3.6.1.4.1.9.1.1
//! layer1:
//!   1:
//!     ifName: Gi1/0/1
//!     ifType: 6
//!     vlans: [10]
//!     macs: ["00:11:22:33:44:55"]
//! layer2:
//!   vlans:
//!     10: { name: users, state: 1 }
//! ```
//!
//! Unknown keys are ignored; everything but `misc.zone` is optional at parse
//! time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// File extension of snapshot files (matched case-insensitively).
pub const SNAPSHOT_EXTENSION: &str = "yaml";

/// Errors reading or interpreting a snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse snapshot '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Snapshot has no misc.zone")]
    MissingZone,

    #[error("Snapshot has no misc.host")]
    MissingHost,
}

/// A parsed snapshot document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub misc: Misc,
    pub system: System,
    /// Layer 1 data keyed by ifIndex.
    pub layer1: BTreeMap<i64, Layer1>,
    pub layer2: Layer2,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Misc {
    pub zone: Option<String>,
    pub host: Option<String>,
    /// Poll time in seconds since the epoch.
    pub timestamp: Option<i64>,
}

/// SNMPv2-MIB system group.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct System {
    pub sys_name: Option<String>,
    pub sys_descr: Option<String>,
    #[serde(rename = "sysObjectID")]
    pub sys_object_id: Option<String>,
    pub sys_up_time: Option<i64>,
}

/// IF-MIB data for one ifIndex, plus the poller's vendor-neutral additions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Layer1 {
    pub if_name: Option<String>,
    pub if_alias: Option<String>,
    pub if_descr: Option<String>,
    pub if_type: Option<i64>,
    pub if_speed: Option<i64>,
    pub if_admin_status: Option<i64>,
    pub if_oper_status: Option<i64>,
    pub duplex: Option<i64>,
    pub nativevlan: Option<i64>,
    pub trunk: Option<bool>,
    pub vlans: Vec<i64>,
    pub macs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Layer2 {
    pub vlans: BTreeMap<i64, VlanEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VlanEntry {
    pub name: Option<String>,
    pub state: Option<i64>,
}

impl Snapshot {
    /// Parse a snapshot document. `path` is only used in error messages.
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, SnapshotError> {
        serde_yaml::from_str(content).map_err(|source| SnapshotError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read and parse a snapshot file.
    pub async fn read(path: &Path) -> Result<Self, SnapshotError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SnapshotError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_yaml(&content, path)
    }

    /// The zone this snapshot belongs to, exactly as written. Blank names
    /// count as missing.
    pub fn zone_name(&self) -> Result<&str, SnapshotError> {
        match self.misc.zone.as_deref() {
            Some(zone) if !zone.trim().is_empty() => Ok(zone),
            _ => Err(SnapshotError::MissingZone),
        }
    }

    /// The polled device's hostname.
    pub fn host(&self) -> Result<&str, SnapshotError> {
        match self.misc.host.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() => Ok(host),
            _ => Err(SnapshotError::MissingHost),
        }
    }
}

/// True for regular-file names carrying the snapshot extension.
pub fn is_snapshot_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SNAPSHOT_EXTENSION))
}

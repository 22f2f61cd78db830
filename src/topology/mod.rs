//! Topology processor: turns one zone's parsed snapshot into topology rows.
//!
//! Called once per unit of work by the dispatcher. Writes are idempotent
//! upserts keyed on natural keys, so replaying a unit leaves the same rows.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::interfaces::{NewDevice, NewInterface, StoreError, TopologyStore};
use crate::snapshot::{Layer1, Snapshot, SnapshotError};

/// IANA ifType for ethernetCsmacd.
const IF_TYPE_ETHERNET: i64 = 6;

/// Errors from processing one zone's snapshot.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(#[from] SnapshotError),
}

impl ProcessError {
    /// True when the failure is the row store going away rather than bad data.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ProcessError::Store(e) if e.is_unavailable())
    }
}

/// Transforms one zone's snapshot into persisted topology.
#[async_trait]
pub trait TopologyProcessor: Send + Sync {
    async fn process(&self, zone_id: i64, snapshot: &Snapshot) -> Result<(), ProcessError>;
}

/// Row-store backed topology processor.
pub struct StoreTopologyProcessor {
    store: Arc<dyn TopologyStore>,
}

impl StoreTopologyProcessor {
    pub fn new(store: Arc<dyn TopologyStore>) -> Self {
        Self { store }
    }

    async fn interface(
        &self,
        device_id: i64,
        ifindex: i64,
        layer1: &Layer1,
    ) -> Result<i64, StoreError> {
        self.store
            .upsert_interface(&NewInterface {
                device_id,
                ifindex,
                ifname: layer1.if_name.clone(),
                ifalias: layer1.if_alias.clone(),
                ifdescr: layer1.if_descr.clone(),
                iftype: layer1.if_type.unwrap_or(0),
                ifspeed: layer1.if_speed.unwrap_or(0),
                ifadminstatus: layer1.if_admin_status.unwrap_or(0),
                ifoperstatus: layer1.if_oper_status.unwrap_or(0),
                duplex: layer1.duplex,
                nativevlan: layer1.nativevlan,
                trunk: layer1.trunk.unwrap_or(false),
                ethernet: is_ethernet(layer1),
            })
            .await
    }
}

#[async_trait]
impl TopologyProcessor for StoreTopologyProcessor {
    async fn process(&self, zone_id: i64, snapshot: &Snapshot) -> Result<(), ProcessError> {
        let host = snapshot.host()?;
        debug!(zone_id, host, "processing device snapshot");

        let device_id = self
            .store
            .upsert_device(&NewDevice {
                zone_id,
                hostname: host.to_string(),
                sys_name: snapshot.system.sys_name.clone(),
                sys_description: snapshot.system.sys_descr.clone(),
                sys_objectid: snapshot.system.sys_object_id.clone(),
                sys_uptime: snapshot.system.sys_up_time.unwrap_or(0),
                last_polled: snapshot.misc.timestamp.unwrap_or(0),
            })
            .await?;

        let mut vlan_ids = BTreeMap::new();
        for (vlan, entry) in &snapshot.layer2.vlans {
            let id = self
                .store
                .upsert_vlan(device_id, *vlan, entry.name.as_deref(), entry.state)
                .await?;
            vlan_ids.insert(*vlan, id);
        }

        for (ifindex, layer1) in &snapshot.layer1 {
            let interface_id = self.interface(device_id, *ifindex, layer1).await?;

            for vlan in &layer1.vlans {
                let vlan_id = match vlan_ids.get(vlan) {
                    Some(id) => *id,
                    None => {
                        let id = self.store.upsert_vlan(device_id, *vlan, None, None).await?;
                        vlan_ids.insert(*vlan, id);
                        id
                    }
                };
                self.store.link_vlan(interface_id, vlan_id).await?;
            }

            for raw in &layer1.macs {
                let Some(mac) = normalize_mac(raw) else {
                    warn!(host, ifindex, mac = %raw, "skipping malformed MAC address");
                    continue;
                };
                let mac_id = self.store.upsert_mac(zone_id, &mac).await?;
                self.store.link_mac(interface_id, mac_id).await?;
            }
        }

        debug!(
            zone_id,
            host,
            interfaces = snapshot.layer1.len(),
            vlans = vlan_ids.len(),
            "device snapshot processed"
        );
        Ok(())
    }
}

/// Ethernet ports are ethernetCsmacd interfaces, except layer 2 VLAN
/// interfaces some vendors also report as ethernetCsmacd.
pub fn is_ethernet(layer1: &Layer1) -> bool {
    if layer1.if_type != Some(IF_TYPE_ETHERNET) {
        return false;
    }
    let name = layer1.if_name.as_deref().unwrap_or_default().to_lowercase();
    !name.starts_with("vl")
}

/// Canonical `aa:bb:cc:dd:ee:ff` form of a MAC written with `:`, `-`, `.`
/// or no separators.
pub fn normalize_mac(raw: &str) -> Option<String> {
    let hex: String = raw
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let octets: Vec<&str> = (0..12).step_by(2).map(|i| &hex[i..i + 2]).collect();
    Some(octets.join(":"))
}

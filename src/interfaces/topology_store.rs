//! Topology storage interface.
//!
//! Devices, interfaces, VLANs and MACs polled from one zone. Every row is
//! tagged with its zone (directly, or through its device), and therefore with
//! the event that owns the zone.

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::event_store::Result;

/// A polled network device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: i64,
    pub zone_id: i64,
    pub hostname: String,
    pub sys_name: Option<String>,
    pub sys_description: Option<String>,
    pub sys_objectid: Option<String>,
    pub sys_uptime: i64,
    pub last_polled: i64,
    pub enabled: bool,
}

/// Upsert form of [`Device`], keyed on `(zone_id, hostname)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDevice {
    pub zone_id: i64,
    pub hostname: String,
    pub sys_name: Option<String>,
    pub sys_description: Option<String>,
    pub sys_objectid: Option<String>,
    pub sys_uptime: i64,
    pub last_polled: i64,
}

/// A layer 1 interface on a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub id: i64,
    pub device_id: i64,
    pub ifindex: i64,
    pub ifname: Option<String>,
    pub ifalias: Option<String>,
    pub ifdescr: Option<String>,
    pub iftype: i64,
    pub ifspeed: i64,
    pub ifadminstatus: i64,
    pub ifoperstatus: i64,
    pub duplex: Option<i64>,
    pub nativevlan: Option<i64>,
    pub trunk: bool,
    pub ethernet: bool,
    pub enabled: bool,
}

/// Upsert form of [`Interface`], keyed on `(device_id, ifindex)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewInterface {
    pub device_id: i64,
    pub ifindex: i64,
    pub ifname: Option<String>,
    pub ifalias: Option<String>,
    pub ifdescr: Option<String>,
    pub iftype: i64,
    pub ifspeed: i64,
    pub ifadminstatus: i64,
    pub ifoperstatus: i64,
    pub duplex: Option<i64>,
    pub nativevlan: Option<i64>,
    pub trunk: bool,
    pub ethernet: bool,
}

/// A VLAN configured on a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vlan {
    pub id: i64,
    pub device_id: i64,
    pub vlan: i64,
    pub name: Option<String>,
    pub state: Option<i64>,
    pub enabled: bool,
}

/// A MAC address seen in a zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mac {
    pub id: i64,
    pub zone_id: i64,
    pub mac: String,
    pub enabled: bool,
}

/// Device as seen by readers: identified by zone name and hostname.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeviceFact {
    pub zone: String,
    pub hostname: String,
    pub sys_name: Option<String>,
    pub sys_description: Option<String>,
    pub sys_objectid: Option<String>,
    pub sys_uptime: i64,
    pub last_polled: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct InterfaceFact {
    pub zone: String,
    pub hostname: String,
    pub ifindex: i64,
    pub ifname: Option<String>,
    pub ifalias: Option<String>,
    pub ifdescr: Option<String>,
    pub iftype: i64,
    pub ifspeed: i64,
    pub ifadminstatus: i64,
    pub ifoperstatus: i64,
    pub duplex: Option<i64>,
    pub nativevlan: Option<i64>,
    pub trunk: bool,
    pub ethernet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VlanFact {
    pub zone: String,
    pub hostname: String,
    pub vlan: i64,
    pub name: Option<String>,
    pub state: Option<i64>,
}

/// Interface membership in a VLAN.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VlanPortFact {
    pub zone: String,
    pub hostname: String,
    pub ifindex: i64,
    pub vlan: i64,
}

/// A MAC address learned on an interface.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MacPortFact {
    pub zone: String,
    pub hostname: String,
    pub ifindex: i64,
    pub mac: String,
}

/// Every topology fact belonging to one event, keyed by natural keys rather
/// than generated ids so two ingestions of the same data compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologySnapshot {
    pub zones: BTreeSet<String>,
    pub devices: BTreeSet<DeviceFact>,
    pub interfaces: BTreeSet<InterfaceFact>,
    pub vlans: BTreeSet<VlanFact>,
    pub vlan_ports: BTreeSet<VlanPortFact>,
    pub macs: BTreeSet<(String, String)>,
    pub mac_ports: BTreeSet<MacPortFact>,
}

impl TopologySnapshot {
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty() && self.devices.is_empty()
    }
}

/// Interface for topology persistence.
///
/// Upserts are idempotent on their natural keys and return the row id.
#[async_trait]
pub trait TopologyStore: Send + Sync {
    async fn upsert_device(&self, device: &NewDevice) -> Result<i64>;

    async fn upsert_interface(&self, interface: &NewInterface) -> Result<i64>;

    /// Create or update a VLAN. A `None` name or state never overwrites a
    /// value already stored.
    async fn upsert_vlan(
        &self,
        device_id: i64,
        vlan: i64,
        name: Option<&str>,
        state: Option<i64>,
    ) -> Result<i64>;

    async fn upsert_mac(&self, zone_id: i64, mac: &str) -> Result<i64>;

    async fn link_vlan(&self, interface_id: i64, vlan_id: i64) -> Result<()>;

    async fn link_mac(&self, interface_id: i64, mac_id: i64) -> Result<()>;

    async fn devices(&self, zone_id: i64) -> Result<Vec<Device>>;

    async fn interfaces(&self, device_id: i64) -> Result<Vec<Interface>>;

    async fn vlans(&self, device_id: i64) -> Result<Vec<Vlan>>;

    async fn macs(&self, zone_id: i64) -> Result<Vec<Mac>>;

    /// All facts for one event.
    async fn snapshot(&self, event_id: i64) -> Result<TopologySnapshot>;
}

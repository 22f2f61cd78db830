//! Abstract interfaces for the row store.
//!
//! These traits define the contracts the ingestion engine consumes for:
//! - Events (one per ingestion run)
//! - Zones (named topology partitions scoped to an event)
//! - Root (the pointer to the current event)
//! - Topology rows (devices, interfaces, VLANs, MACs)
//!
//! "Exists" lookups return `Ok(None)` when the row is absent; that is not an
//! error.

pub mod event_store;
pub mod root_store;
pub mod topology_store;
pub mod zone_store;

pub use event_store::{Event, EventStore, Result, StoreError};
pub use root_store::{Root, RootStore, ROOT_ID};
pub use topology_store::{
    Device, DeviceFact, Interface, InterfaceFact, Mac, MacPortFact, NewDevice, NewInterface,
    TopologySnapshot, TopologyStore, Vlan, VlanFact, VlanPortFact,
};
pub use zone_store::{NewZone, Zone, ZoneStore};

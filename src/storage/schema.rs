//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Events table schema.
#[derive(Iden)]
pub enum Events {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "name"]
    Name,
    #[iden = "enabled"]
    Enabled,
}

/// Root pointer table schema. Holds at most one row.
#[derive(Iden)]
pub enum Roots {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "current_event_id"]
    CurrentEventId,
    #[iden = "name"]
    Name,
    #[iden = "enabled"]
    Enabled,
}

/// Zones table schema.
#[derive(Iden)]
pub enum Zones {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "event_id"]
    EventId,
    #[iden = "name"]
    Name,
    #[iden = "company_name"]
    CompanyName,
    #[iden = "address_0"]
    Address0,
    #[iden = "address_1"]
    Address1,
    #[iden = "address_2"]
    Address2,
    #[iden = "city"]
    City,
    #[iden = "state"]
    State,
    #[iden = "country"]
    Country,
    #[iden = "postal_code"]
    PostalCode,
    #[iden = "phone"]
    Phone,
    #[iden = "notes"]
    Notes,
    #[iden = "enabled"]
    Enabled,
}

/// Devices table schema.
#[derive(Iden)]
pub enum Devices {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "zone_id"]
    ZoneId,
    #[iden = "hostname"]
    Hostname,
    #[iden = "sys_name"]
    SysName,
    #[iden = "sys_description"]
    SysDescription,
    #[iden = "sys_objectid"]
    SysObjectid,
    #[iden = "sys_uptime"]
    SysUptime,
    #[iden = "last_polled"]
    LastPolled,
    #[iden = "enabled"]
    Enabled,
}

/// Layer 1 interfaces table schema.
#[derive(Iden)]
pub enum Interfaces {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "device_id"]
    DeviceId,
    #[iden = "ifindex"]
    Ifindex,
    #[iden = "ifname"]
    Ifname,
    #[iden = "ifalias"]
    Ifalias,
    #[iden = "ifdescr"]
    Ifdescr,
    #[iden = "iftype"]
    Iftype,
    #[iden = "ifspeed"]
    Ifspeed,
    #[iden = "ifadminstatus"]
    Ifadminstatus,
    #[iden = "ifoperstatus"]
    Ifoperstatus,
    #[iden = "duplex"]
    Duplex,
    #[iden = "nativevlan"]
    Nativevlan,
    #[iden = "trunk"]
    Trunk,
    #[iden = "ethernet"]
    Ethernet,
    #[iden = "enabled"]
    Enabled,
}

/// VLANs table schema.
#[derive(Iden)]
pub enum Vlans {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "device_id"]
    DeviceId,
    #[iden = "vlan"]
    Vlan,
    #[iden = "name"]
    Name,
    #[iden = "state"]
    State,
    #[iden = "enabled"]
    Enabled,
}

/// Interface to VLAN membership.
#[derive(Iden)]
pub enum VlanPorts {
    Table,
    #[iden = "interface_id"]
    InterfaceId,
    #[iden = "vlan_id"]
    VlanId,
}

/// MAC addresses table schema.
#[derive(Iden)]
pub enum Macs {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "zone_id"]
    ZoneId,
    #[iden = "mac"]
    Mac,
    #[iden = "enabled"]
    Enabled,
}

/// Interface to MAC association.
#[derive(Iden)]
pub enum MacPorts {
    Table,
    #[iden = "interface_id"]
    InterfaceId,
    #[iden = "mac_id"]
    MacId,
}

/// SQL for creating the events table.
pub const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    enabled INTEGER NOT NULL DEFAULT 1
);
"#;

/// SQL for creating the roots table. The only allowed id is `ROOT_ID`.
pub const CREATE_ROOTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS roots (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    current_event_id INTEGER NOT NULL REFERENCES events(id),
    name TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1
);
"#;

/// SQL for creating the zones table.
pub const CREATE_ZONES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS zones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id INTEGER NOT NULL REFERENCES events(id),
    name TEXT NOT NULL,
    company_name TEXT,
    address_0 TEXT,
    address_1 TEXT,
    address_2 TEXT,
    city TEXT,
    state TEXT,
    country TEXT,
    postal_code TEXT,
    phone TEXT,
    notes TEXT,
    enabled INTEGER NOT NULL DEFAULT 1,
    UNIQUE (event_id, name)
);

CREATE INDEX IF NOT EXISTS idx_zones_event ON zones(event_id);
"#;

/// SQL for creating the topology tables.
pub const CREATE_TOPOLOGY_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS devices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    zone_id INTEGER NOT NULL REFERENCES zones(id),
    hostname TEXT NOT NULL,
    sys_name TEXT,
    sys_description TEXT,
    sys_objectid TEXT,
    sys_uptime INTEGER NOT NULL DEFAULT 0,
    last_polled INTEGER NOT NULL DEFAULT 0,
    enabled INTEGER NOT NULL DEFAULT 1,
    UNIQUE (zone_id, hostname)
);

CREATE TABLE IF NOT EXISTS interfaces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id INTEGER NOT NULL REFERENCES devices(id),
    ifindex INTEGER NOT NULL,
    ifname TEXT,
    ifalias TEXT,
    ifdescr TEXT,
    iftype INTEGER NOT NULL DEFAULT 0,
    ifspeed INTEGER NOT NULL DEFAULT 0,
    ifadminstatus INTEGER NOT NULL DEFAULT 0,
    ifoperstatus INTEGER NOT NULL DEFAULT 0,
    duplex INTEGER,
    nativevlan INTEGER,
    trunk INTEGER NOT NULL DEFAULT 0,
    ethernet INTEGER NOT NULL DEFAULT 0,
    enabled INTEGER NOT NULL DEFAULT 1,
    UNIQUE (device_id, ifindex)
);

CREATE TABLE IF NOT EXISTS vlans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id INTEGER NOT NULL REFERENCES devices(id),
    vlan INTEGER NOT NULL,
    name TEXT,
    state INTEGER,
    enabled INTEGER NOT NULL DEFAULT 1,
    UNIQUE (device_id, vlan)
);

CREATE TABLE IF NOT EXISTS vlan_ports (
    interface_id INTEGER NOT NULL REFERENCES interfaces(id),
    vlan_id INTEGER NOT NULL REFERENCES vlans(id),
    PRIMARY KEY (interface_id, vlan_id)
);

CREATE TABLE IF NOT EXISTS macs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    zone_id INTEGER NOT NULL REFERENCES zones(id),
    mac TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    UNIQUE (zone_id, mac)
);

CREATE TABLE IF NOT EXISTS mac_ports (
    interface_id INTEGER NOT NULL REFERENCES interfaces(id),
    mac_id INTEGER NOT NULL REFERENCES macs(id),
    PRIMARY KEY (interface_id, mac_id)
);

CREATE INDEX IF NOT EXISTS idx_devices_zone ON devices(zone_id);
CREATE INDEX IF NOT EXISTS idx_interfaces_device ON interfaces(device_id);
CREATE INDEX IF NOT EXISTS idx_vlans_device ON vlans(device_id);
CREATE INDEX IF NOT EXISTS idx_macs_zone ON macs(zone_id);
"#;

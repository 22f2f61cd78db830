//! SQLite implementation of TopologyStore.

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};

use crate::interfaces::{
    Device, DeviceFact, Interface, InterfaceFact, Mac, MacPortFact, NewDevice, NewInterface,
    Result, StoreError, TopologySnapshot, TopologyStore, Vlan, VlanFact, VlanPortFact,
};
use crate::storage::schema::{
    Devices, Interfaces, MacPorts, Macs, VlanPorts, Vlans, CREATE_TOPOLOGY_TABLES,
};

/// SQLite-backed topology store.
pub struct SqliteTopologyStore {
    pool: SqlitePool,
}

impl SqliteTopologyStore {
    /// Create a new SQLite topology store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_TOPOLOGY_TABLES).execute(&self.pool).await?;
        Ok(())
    }

    /// Read back the id of a row just upserted on its natural key.
    async fn id_of(&self, query: String, table: &'static str) -> Result<i64> {
        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.map(|r| r.get::<i64, _>("id"))
            .ok_or_else(|| StoreError::Corrupt {
                table,
                reason: "upserted row not found".to_string(),
            })
    }
}

#[async_trait]
impl TopologyStore for SqliteTopologyStore {
    async fn upsert_device(&self, device: &NewDevice) -> Result<i64> {
        let query = Query::insert()
            .into_table(Devices::Table)
            .columns([
                Devices::ZoneId,
                Devices::Hostname,
                Devices::SysName,
                Devices::SysDescription,
                Devices::SysObjectid,
                Devices::SysUptime,
                Devices::LastPolled,
                Devices::Enabled,
            ])
            .values_panic([
                device.zone_id.into(),
                device.hostname.clone().into(),
                device.sys_name.clone().into(),
                device.sys_description.clone().into(),
                device.sys_objectid.clone().into(),
                device.sys_uptime.into(),
                device.last_polled.into(),
                1_i64.into(),
            ])
            .on_conflict(
                OnConflict::columns([Devices::ZoneId, Devices::Hostname])
                    .update_columns([
                        Devices::SysName,
                        Devices::SysDescription,
                        Devices::SysObjectid,
                        Devices::SysUptime,
                        Devices::LastPolled,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        let select = Query::select()
            .column(Devices::Id)
            .from(Devices::Table)
            .and_where(Expr::col(Devices::ZoneId).eq(device.zone_id))
            .and_where(Expr::col(Devices::Hostname).eq(device.hostname.as_str()))
            .to_string(SqliteQueryBuilder);

        self.id_of(select, "devices").await
    }

    async fn upsert_interface(&self, interface: &NewInterface) -> Result<i64> {
        let query = Query::insert()
            .into_table(Interfaces::Table)
            .columns([
                Interfaces::DeviceId,
                Interfaces::Ifindex,
                Interfaces::Ifname,
                Interfaces::Ifalias,
                Interfaces::Ifdescr,
                Interfaces::Iftype,
                Interfaces::Ifspeed,
                Interfaces::Ifadminstatus,
                Interfaces::Ifoperstatus,
                Interfaces::Duplex,
                Interfaces::Nativevlan,
                Interfaces::Trunk,
                Interfaces::Ethernet,
                Interfaces::Enabled,
            ])
            .values_panic([
                interface.device_id.into(),
                interface.ifindex.into(),
                interface.ifname.clone().into(),
                interface.ifalias.clone().into(),
                interface.ifdescr.clone().into(),
                interface.iftype.into(),
                interface.ifspeed.into(),
                interface.ifadminstatus.into(),
                interface.ifoperstatus.into(),
                interface.duplex.into(),
                interface.nativevlan.into(),
                i64::from(interface.trunk).into(),
                i64::from(interface.ethernet).into(),
                1_i64.into(),
            ])
            .on_conflict(
                OnConflict::columns([Interfaces::DeviceId, Interfaces::Ifindex])
                    .update_columns([
                        Interfaces::Ifname,
                        Interfaces::Ifalias,
                        Interfaces::Ifdescr,
                        Interfaces::Iftype,
                        Interfaces::Ifspeed,
                        Interfaces::Ifadminstatus,
                        Interfaces::Ifoperstatus,
                        Interfaces::Duplex,
                        Interfaces::Nativevlan,
                        Interfaces::Trunk,
                        Interfaces::Ethernet,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        let select = Query::select()
            .column(Interfaces::Id)
            .from(Interfaces::Table)
            .and_where(Expr::col(Interfaces::DeviceId).eq(interface.device_id))
            .and_where(Expr::col(Interfaces::Ifindex).eq(interface.ifindex))
            .to_string(SqliteQueryBuilder);

        self.id_of(select, "interfaces").await
    }

    async fn upsert_vlan(
        &self,
        device_id: i64,
        vlan: i64,
        name: Option<&str>,
        state: Option<i64>,
    ) -> Result<i64> {
        let query = Query::insert()
            .into_table(Vlans::Table)
            .columns([
                Vlans::DeviceId,
                Vlans::Vlan,
                Vlans::Name,
                Vlans::State,
                Vlans::Enabled,
            ])
            .values_panic([
                device_id.into(),
                vlan.into(),
                name.map(str::to_string).into(),
                state.into(),
                1_i64.into(),
            ])
            .on_conflict(
                OnConflict::columns([Vlans::DeviceId, Vlans::Vlan])
                    .value(Vlans::Name, Expr::cust("COALESCE(excluded.name, vlans.name)"))
                    .value(Vlans::State, Expr::cust("COALESCE(excluded.state, vlans.state)"))
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        let select = Query::select()
            .column(Vlans::Id)
            .from(Vlans::Table)
            .and_where(Expr::col(Vlans::DeviceId).eq(device_id))
            .and_where(Expr::col(Vlans::Vlan).eq(vlan))
            .to_string(SqliteQueryBuilder);

        self.id_of(select, "vlans").await
    }

    async fn upsert_mac(&self, zone_id: i64, mac: &str) -> Result<i64> {
        let query = Query::insert()
            .into_table(Macs::Table)
            .columns([Macs::ZoneId, Macs::Mac, Macs::Enabled])
            .values_panic([zone_id.into(), mac.into(), 1_i64.into()])
            .on_conflict(OnConflict::columns([Macs::ZoneId, Macs::Mac]).do_nothing().to_owned())
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        let select = Query::select()
            .column(Macs::Id)
            .from(Macs::Table)
            .and_where(Expr::col(Macs::ZoneId).eq(zone_id))
            .and_where(Expr::col(Macs::Mac).eq(mac))
            .to_string(SqliteQueryBuilder);

        self.id_of(select, "macs").await
    }

    async fn link_vlan(&self, interface_id: i64, vlan_id: i64) -> Result<()> {
        let query = Query::insert()
            .into_table(VlanPorts::Table)
            .columns([VlanPorts::InterfaceId, VlanPorts::VlanId])
            .values_panic([interface_id.into(), vlan_id.into()])
            .on_conflict(
                OnConflict::columns([VlanPorts::InterfaceId, VlanPorts::VlanId])
                    .do_nothing()
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn link_mac(&self, interface_id: i64, mac_id: i64) -> Result<()> {
        let query = Query::insert()
            .into_table(MacPorts::Table)
            .columns([MacPorts::InterfaceId, MacPorts::MacId])
            .values_panic([interface_id.into(), mac_id.into()])
            .on_conflict(
                OnConflict::columns([MacPorts::InterfaceId, MacPorts::MacId])
                    .do_nothing()
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn devices(&self, zone_id: i64) -> Result<Vec<Device>> {
        let query = Query::select()
            .columns([
                Devices::Id,
                Devices::ZoneId,
                Devices::Hostname,
                Devices::SysName,
                Devices::SysDescription,
                Devices::SysObjectid,
                Devices::SysUptime,
                Devices::LastPolled,
                Devices::Enabled,
            ])
            .from(Devices::Table)
            .and_where(Expr::col(Devices::ZoneId).eq(zone_id))
            .order_by(Devices::Hostname, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let devices = rows
            .iter()
            .map(|r| Device {
                id: r.get("id"),
                zone_id: r.get("zone_id"),
                hostname: r.get("hostname"),
                sys_name: r.get("sys_name"),
                sys_description: r.get("sys_description"),
                sys_objectid: r.get("sys_objectid"),
                sys_uptime: r.get("sys_uptime"),
                last_polled: r.get("last_polled"),
                enabled: r.get::<i64, _>("enabled") != 0,
            })
            .collect();

        Ok(devices)
    }

    async fn interfaces(&self, device_id: i64) -> Result<Vec<Interface>> {
        let query = Query::select()
            .columns([
                Interfaces::Id,
                Interfaces::DeviceId,
                Interfaces::Ifindex,
                Interfaces::Ifname,
                Interfaces::Ifalias,
                Interfaces::Ifdescr,
                Interfaces::Iftype,
                Interfaces::Ifspeed,
                Interfaces::Ifadminstatus,
                Interfaces::Ifoperstatus,
                Interfaces::Duplex,
                Interfaces::Nativevlan,
                Interfaces::Trunk,
                Interfaces::Ethernet,
                Interfaces::Enabled,
            ])
            .from(Interfaces::Table)
            .and_where(Expr::col(Interfaces::DeviceId).eq(device_id))
            .order_by(Interfaces::Ifindex, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let interfaces = rows
            .iter()
            .map(|r| Interface {
                id: r.get("id"),
                device_id: r.get("device_id"),
                ifindex: r.get("ifindex"),
                ifname: r.get("ifname"),
                ifalias: r.get("ifalias"),
                ifdescr: r.get("ifdescr"),
                iftype: r.get("iftype"),
                ifspeed: r.get("ifspeed"),
                ifadminstatus: r.get("ifadminstatus"),
                ifoperstatus: r.get("ifoperstatus"),
                duplex: r.get("duplex"),
                nativevlan: r.get("nativevlan"),
                trunk: r.get::<i64, _>("trunk") != 0,
                ethernet: r.get::<i64, _>("ethernet") != 0,
                enabled: r.get::<i64, _>("enabled") != 0,
            })
            .collect();

        Ok(interfaces)
    }

    async fn vlans(&self, device_id: i64) -> Result<Vec<Vlan>> {
        let query = Query::select()
            .columns([
                Vlans::Id,
                Vlans::DeviceId,
                Vlans::Vlan,
                Vlans::Name,
                Vlans::State,
                Vlans::Enabled,
            ])
            .from(Vlans::Table)
            .and_where(Expr::col(Vlans::DeviceId).eq(device_id))
            .order_by(Vlans::Vlan, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let vlans = rows
            .iter()
            .map(|r| Vlan {
                id: r.get("id"),
                device_id: r.get("device_id"),
                vlan: r.get("vlan"),
                name: r.get("name"),
                state: r.get("state"),
                enabled: r.get::<i64, _>("enabled") != 0,
            })
            .collect();

        Ok(vlans)
    }

    async fn macs(&self, zone_id: i64) -> Result<Vec<Mac>> {
        let query = Query::select()
            .columns([Macs::Id, Macs::ZoneId, Macs::Mac, Macs::Enabled])
            .from(Macs::Table)
            .and_where(Expr::col(Macs::ZoneId).eq(zone_id))
            .order_by(Macs::Mac, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let macs = rows
            .iter()
            .map(|r| Mac {
                id: r.get("id"),
                zone_id: r.get("zone_id"),
                mac: r.get("mac"),
                enabled: r.get::<i64, _>("enabled") != 0,
            })
            .collect();

        Ok(macs)
    }

    async fn snapshot(&self, event_id: i64) -> Result<TopologySnapshot> {
        let mut snapshot = TopologySnapshot::default();

        let rows = sqlx::query("SELECT name FROM zones WHERE event_id = ?1")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;
        snapshot.zones = rows.iter().map(|r| r.get("name")).collect();

        let rows = sqlx::query(
            "SELECT z.name AS zone, d.hostname, d.sys_name, d.sys_description,
                    d.sys_objectid, d.sys_uptime, d.last_polled
             FROM devices d
             JOIN zones z ON z.id = d.zone_id
             WHERE z.event_id = ?1",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        snapshot.devices = rows
            .iter()
            .map(|r| DeviceFact {
                zone: r.get("zone"),
                hostname: r.get("hostname"),
                sys_name: r.get("sys_name"),
                sys_description: r.get("sys_description"),
                sys_objectid: r.get("sys_objectid"),
                sys_uptime: r.get("sys_uptime"),
                last_polled: r.get("last_polled"),
            })
            .collect();

        let rows = sqlx::query(
            "SELECT z.name AS zone, d.hostname, i.ifindex, i.ifname, i.ifalias, i.ifdescr,
                    i.iftype, i.ifspeed, i.ifadminstatus, i.ifoperstatus, i.duplex,
                    i.nativevlan, i.trunk, i.ethernet
             FROM interfaces i
             JOIN devices d ON d.id = i.device_id
             JOIN zones z ON z.id = d.zone_id
             WHERE z.event_id = ?1",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        snapshot.interfaces = rows
            .iter()
            .map(|r| InterfaceFact {
                zone: r.get("zone"),
                hostname: r.get("hostname"),
                ifindex: r.get("ifindex"),
                ifname: r.get("ifname"),
                ifalias: r.get("ifalias"),
                ifdescr: r.get("ifdescr"),
                iftype: r.get("iftype"),
                ifspeed: r.get("ifspeed"),
                ifadminstatus: r.get("ifadminstatus"),
                ifoperstatus: r.get("ifoperstatus"),
                duplex: r.get("duplex"),
                nativevlan: r.get("nativevlan"),
                trunk: r.get::<i64, _>("trunk") != 0,
                ethernet: r.get::<i64, _>("ethernet") != 0,
            })
            .collect();

        let rows = sqlx::query(
            "SELECT z.name AS zone, d.hostname, v.vlan, v.name, v.state
             FROM vlans v
             JOIN devices d ON d.id = v.device_id
             JOIN zones z ON z.id = d.zone_id
             WHERE z.event_id = ?1",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        snapshot.vlans = rows
            .iter()
            .map(|r| VlanFact {
                zone: r.get("zone"),
                hostname: r.get("hostname"),
                vlan: r.get("vlan"),
                name: r.get("name"),
                state: r.get("state"),
            })
            .collect();

        let rows = sqlx::query(
            "SELECT z.name AS zone, d.hostname, i.ifindex, v.vlan
             FROM vlan_ports vp
             JOIN interfaces i ON i.id = vp.interface_id
             JOIN vlans v ON v.id = vp.vlan_id
             JOIN devices d ON d.id = i.device_id
             JOIN zones z ON z.id = d.zone_id
             WHERE z.event_id = ?1",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        snapshot.vlan_ports = rows
            .iter()
            .map(|r| VlanPortFact {
                zone: r.get("zone"),
                hostname: r.get("hostname"),
                ifindex: r.get("ifindex"),
                vlan: r.get("vlan"),
            })
            .collect();

        let rows = sqlx::query(
            "SELECT z.name AS zone, m.mac
             FROM macs m
             JOIN zones z ON z.id = m.zone_id
             WHERE z.event_id = ?1",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        snapshot.macs = rows.iter().map(|r| (r.get("zone"), r.get("mac"))).collect();

        let rows = sqlx::query(
            "SELECT z.name AS zone, d.hostname, i.ifindex, m.mac
             FROM mac_ports mp
             JOIN interfaces i ON i.id = mp.interface_id
             JOIN macs m ON m.id = mp.mac_id
             JOIN devices d ON d.id = i.device_id
             JOIN zones z ON z.id = d.zone_id
             WHERE z.event_id = ?1",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        snapshot.mac_ports = rows
            .iter()
            .map(|r| MacPortFact {
                zone: r.get("zone"),
                hostname: r.get("hostname"),
                ifindex: r.get("ifindex"),
                mac: r.get("mac"),
            })
            .collect();

        Ok(snapshot)
    }
}

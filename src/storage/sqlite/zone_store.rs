//! SQLite ZoneStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::interfaces::{NewZone, Result, Zone, ZoneStore};
use crate::storage::schema::{Zones, CREATE_ZONES_TABLE};

/// SQLite implementation of ZoneStore.
pub struct SqliteZoneStore {
    pool: SqlitePool,
}

impl SqliteZoneStore {
    /// Create a new SQLite zone store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_ZONES_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    fn select() -> sea_query::SelectStatement {
        Query::select()
            .columns([
                Zones::Id,
                Zones::EventId,
                Zones::Name,
                Zones::CompanyName,
                Zones::Address0,
                Zones::Address1,
                Zones::Address2,
                Zones::City,
                Zones::State,
                Zones::Country,
                Zones::PostalCode,
                Zones::Phone,
                Zones::Notes,
                Zones::Enabled,
            ])
            .from(Zones::Table)
            .to_owned()
    }
}

fn zone_from_row(row: &SqliteRow) -> Zone {
    Zone {
        id: row.get("id"),
        event_id: row.get("event_id"),
        name: row.get("name"),
        company_name: row.get("company_name"),
        address_0: row.get("address_0"),
        address_1: row.get("address_1"),
        address_2: row.get("address_2"),
        city: row.get("city"),
        state: row.get("state"),
        country: row.get("country"),
        postal_code: row.get("postal_code"),
        phone: row.get("phone"),
        notes: row.get("notes"),
        enabled: row.get::<i64, _>("enabled") != 0,
    }
}

#[async_trait]
impl ZoneStore for SqliteZoneStore {
    async fn exists(&self, event_id: i64, name: &str) -> Result<Option<Zone>> {
        let query = Self::select()
            .and_where(Expr::col(Zones::EventId).eq(event_id))
            .and_where(Expr::col(Zones::Name).eq(name))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(zone_from_row))
    }

    async fn insert(&self, zone: &NewZone) -> Result<()> {
        let query = Query::insert()
            .into_table(Zones::Table)
            .columns([
                Zones::EventId,
                Zones::Name,
                Zones::CompanyName,
                Zones::Address0,
                Zones::Address1,
                Zones::Address2,
                Zones::City,
                Zones::State,
                Zones::Country,
                Zones::PostalCode,
                Zones::Phone,
                Zones::Notes,
                Zones::Enabled,
            ])
            .values_panic([
                zone.event_id.into(),
                zone.name.clone().into(),
                zone.company_name.clone().into(),
                zone.address_0.clone().into(),
                zone.address_1.clone().into(),
                zone.address_2.clone().into(),
                zone.city.clone().into(),
                zone.state.clone().into(),
                zone.country.clone().into(),
                zone.postal_code.clone().into(),
                zone.phone.clone().into(),
                zone.notes.clone().into(),
                i64::from(zone.enabled).into(),
            ])
            .on_conflict(
                OnConflict::columns([Zones::EventId, Zones::Name])
                    .do_nothing()
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn zones(&self, event_id: i64) -> Result<Vec<Zone>> {
        let query = Self::select()
            .and_where(Expr::col(Zones::EventId).eq(event_id))
            .order_by(Zones::Name, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(zone_from_row).collect())
    }
}

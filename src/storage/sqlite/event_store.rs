//! SQLite EventStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::interfaces::{Event, EventStore, Result};
use crate::storage::schema::{Events, CREATE_EVENTS_TABLE};

/// SQLite implementation of EventStore.
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Create a new SQLite event store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_EVENTS_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    fn select() -> sea_query::SelectStatement {
        Query::select()
            .columns([Events::Id, Events::Name, Events::Enabled])
            .from(Events::Table)
            .to_owned()
    }
}

fn event_from_row(row: &SqliteRow) -> Event {
    Event {
        id: row.get("id"),
        name: row.get("name"),
        enabled: row.get::<i64, _>("enabled") != 0,
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn exists(&self, name: &str) -> Result<Option<Event>> {
        let query = Self::select()
            .and_where(Expr::col(Events::Name).eq(name))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(event_from_row))
    }

    async fn idx_exists(&self, id: i64) -> Result<Option<Event>> {
        let query = Self::select()
            .and_where(Expr::col(Events::Id).eq(id))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(event_from_row))
    }

    async fn insert(&self, name: &str, enabled: bool) -> Result<()> {
        let query = Query::insert()
            .into_table(Events::Table)
            .columns([Events::Name, Events::Enabled])
            .values_panic([name.into(), i64::from(enabled).into()])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Event>> {
        let query = Self::select()
            .order_by(Events::Id, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(event_from_row).collect())
    }
}

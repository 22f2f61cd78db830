//! SQLite RootStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};

use crate::interfaces::{Result, Root, RootStore};
use crate::storage::schema::{Roots, CREATE_ROOTS_TABLE};

/// SQLite implementation of RootStore.
pub struct SqliteRootStore {
    pool: SqlitePool,
}

impl SqliteRootStore {
    /// Create a new SQLite root store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_ROOTS_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RootStore for SqliteRootStore {
    async fn idx_exists(&self, id: i64) -> Result<Option<Root>> {
        let query = Query::select()
            .columns([Roots::Id, Roots::CurrentEventId, Roots::Name, Roots::Enabled])
            .from(Roots::Table)
            .and_where(Expr::col(Roots::Id).eq(id))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        Ok(row.map(|r| Root {
            id: r.get("id"),
            current_event_id: r.get("current_event_id"),
            name: r.get("name"),
            enabled: r.get::<i64, _>("enabled") != 0,
        }))
    }

    async fn insert(&self, root: &Root) -> Result<()> {
        let query = Query::insert()
            .into_table(Roots::Table)
            .columns([Roots::Id, Roots::CurrentEventId, Roots::Name, Roots::Enabled])
            .values_panic([
                root.id.into(),
                root.current_event_id.into(),
                root.name.clone().into(),
                i64::from(root.enabled).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn update(
        &self,
        id: i64,
        current_event_id: i64,
        name: &str,
        enabled: bool,
    ) -> Result<()> {
        let query = Query::update()
            .table(Roots::Table)
            .values([
                (Roots::CurrentEventId, current_event_id.into()),
                (Roots::Name, name.into()),
                (Roots::Enabled, i64::from(enabled).into()),
            ])
            .and_where(Expr::col(Roots::Id).eq(id))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::{EventStore, ROOT_ID};
    use crate::storage::sqlite::{test_pool, SqliteEventStore};

    #[tokio::test]
    async fn test_insert_and_update_root() {
        let pool = test_pool().await;
        let events = SqliteEventStore::new(pool.clone());
        events.init().await.unwrap();
        let roots = SqliteRootStore::new(pool);
        roots.init().await.unwrap();

        events.insert("first", true).await.unwrap();
        events.insert("second", true).await.unwrap();
        let first = events.exists("first").await.unwrap().unwrap();
        let second = events.exists("second").await.unwrap().unwrap();

        assert!(roots.idx_exists(ROOT_ID).await.unwrap().is_none());

        roots
            .insert(&Root {
                id: ROOT_ID,
                current_event_id: first.id,
                name: "main".into(),
                enabled: true,
            })
            .await
            .unwrap();

        roots.update(ROOT_ID, second.id, "main", true).await.unwrap();

        let root = roots.idx_exists(ROOT_ID).await.unwrap().unwrap();
        assert_eq!(root.current_event_id, second.id);
        assert_eq!(root.name, "main");
        assert!(root.enabled);
    }

    #[tokio::test]
    async fn test_only_one_root_row() {
        let pool = test_pool().await;
        let events = SqliteEventStore::new(pool.clone());
        events.init().await.unwrap();
        let roots = SqliteRootStore::new(pool);
        roots.init().await.unwrap();

        events.insert("first", true).await.unwrap();
        let first = events.exists("first").await.unwrap().unwrap();
        let root = |id| Root {
            id,
            current_event_id: first.id,
            name: "main".into(),
            enabled: true,
        };

        roots.insert(&root(ROOT_ID)).await.unwrap();
        assert!(roots.insert(&root(ROOT_ID)).await.is_err());
        assert!(roots.insert(&root(2)).await.is_err());
        assert!(roots.idx_exists(2).await.unwrap().is_none());
    }
}

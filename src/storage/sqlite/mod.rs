//! SQLite implementations of the row store interfaces.

mod event_store;
mod root_store;
mod topology_store;
mod zone_store;

pub use event_store::SqliteEventStore;
pub use root_store::SqliteRootStore;
pub use topology_store::SqliteTopologyStore;
pub use zone_store::SqliteZoneStore;

/// Single-connection in-memory pool; every connection to `:memory:` is its
/// own database, so the pool must never open a second one.
#[cfg(test)]
pub(crate) async fn test_pool() -> sqlx::SqlitePool {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    let opts = SqliteConnectOptions::new()
        .filename(":memory:")
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await
        .expect("failed to create in-memory pool")
}

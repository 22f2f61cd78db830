//! Event storage interface.
//!
//! An event is the version tag of one ingestion run. Every zone and topology
//! row written by the run hangs off the event's id.

use async_trait::async_trait;

/// Result type for row store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during row store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },
}

impl StoreError {
    /// True when the store itself could not be reached, as opposed to a
    /// single statement being rejected.
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            StoreError::Corrupt { .. } => false,
        }
    }

    /// True when an insert lost a race against a unique key.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Database(sqlx::Error::Database(db)) if db.is_unique_violation())
    }
}

/// A persisted ingestion event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub enabled: bool,
}

/// Interface for event persistence.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Look up an event by its unique name.
    async fn exists(&self, name: &str) -> Result<Option<Event>>;

    /// Look up an event by id.
    async fn idx_exists(&self, id: i64) -> Result<Option<Event>>;

    /// Insert a new event. The generated id is not returned; callers re-read
    /// with [`EventStore::exists`].
    async fn insert(&self, name: &str, enabled: bool) -> Result<()>;

    /// All events, oldest first.
    async fn all(&self) -> Result<Vec<Event>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_failures_are_unavailable() {
        assert!(StoreError::Database(sqlx::Error::PoolClosed).is_unavailable());
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(StoreError::Unavailable("down".into()).is_unavailable());
    }

    #[test]
    fn test_statement_failures_are_not_unavailable() {
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_unavailable());
        assert!(!StoreError::Corrupt {
            table: "events",
            reason: "bad".into()
        }
        .is_unavailable());
    }
}

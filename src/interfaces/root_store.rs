//! Root pointer storage interface.

use async_trait::async_trait;

use super::event_store::Result;

/// Id of the singleton root row.
pub const ROOT_ID: i64 = 1;

/// The singleton pointer to the event readers treat as current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub id: i64,
    pub current_event_id: i64,
    pub name: String,
    pub enabled: bool,
}

/// Interface for the root pointer.
#[async_trait]
pub trait RootStore: Send + Sync {
    async fn idx_exists(&self, id: i64) -> Result<Option<Root>>;

    /// Create the root row. Bootstrapping belongs to whoever provisions the
    /// store; ingestion only ever updates.
    async fn insert(&self, root: &Root) -> Result<()>;

    async fn update(&self, id: i64, current_event_id: i64, name: &str, enabled: bool)
        -> Result<()>;
}

//! Root cutover: repoint the singleton root row at a fully ingested event.

use std::sync::Arc;

use tracing::{info, warn};

use crate::interfaces::{Event, Result, RootStore, ROOT_ID};

/// What a cutover did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutover {
    /// The root now points at the new event.
    Switched { previous_event_id: i64 },
    /// No root row yet; nothing was changed.
    NoRoot,
}

pub struct RootCutover {
    roots: Arc<dyn RootStore>,
}

impl RootCutover {
    pub fn new(roots: Arc<dyn RootStore>) -> Self {
        Self { roots }
    }

    /// Point the root at `event`, keeping its name and enabled flag.
    ///
    /// Must only run once every zone of `event` has been dispatched. Creating
    /// the root row is left to whoever provisions the store.
    pub async fn cutover(&self, event: &Event) -> Result<Cutover> {
        let Some(root) = self.roots.idx_exists(ROOT_ID).await? else {
            warn!(event = %event.name, "no root row, skipping cutover");
            return Ok(Cutover::NoRoot);
        };

        self.roots
            .update(root.id, event.id, &root.name, root.enabled)
            .await?;

        info!(
            previous_event_id = root.current_event_id,
            event_id = event.id,
            event = %event.name,
            "root cut over to new event"
        );

        Ok(Cutover::Switched {
            previous_event_id: root.current_event_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::Root;
    use crate::storage::{sqlite::test_pool, Stores};

    async fn event(stores: &Stores, name: &str) -> Event {
        stores.events.insert(name, true).await.unwrap();
        stores.events.exists(name).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_cutover_updates_pointer_only() {
        let stores = Stores::sqlite(test_pool().await).await.unwrap();
        let old = event(&stores, "old").await;
        let new = event(&stores, "new").await;
        stores
            .roots
            .insert(&Root {
                id: ROOT_ID,
                current_event_id: old.id,
                name: "production".into(),
                enabled: false,
            })
            .await
            .unwrap();

        let outcome = RootCutover::new(stores.roots.clone()).cutover(&new).await.unwrap();

        assert_eq!(
            outcome,
            Cutover::Switched {
                previous_event_id: old.id
            }
        );
        let root = stores.roots.idx_exists(ROOT_ID).await.unwrap().unwrap();
        assert_eq!(root.current_event_id, new.id);
        assert_eq!(root.name, "production");
        assert!(!root.enabled);
    }

    #[tokio::test]
    async fn test_cutover_without_root_is_skipped() {
        let stores = Stores::sqlite(test_pool().await).await.unwrap();
        let new = event(&stores, "new").await;

        let outcome = RootCutover::new(stores.roots.clone()).cutover(&new).await.unwrap();

        assert_eq!(outcome, Cutover::NoRoot);
        assert!(stores.roots.idx_exists(ROOT_ID).await.unwrap().is_none());
    }
}

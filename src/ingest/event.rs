//! Event allocation: mint a unique version name for the run and record it.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use super::IngestError;
use crate::interfaces::{Event, EventStore, StoreError};

/// Attempts at finding an unused event name before giving up.
pub const MAX_NAME_ATTEMPTS: usize = 32;

/// Source of candidate event names.
pub trait NameSource: Send + Sync {
    fn next_name(&self) -> String;
}

/// Hex SHA-256 of a random v4 UUID and the current time.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNameSource;

impl NameSource for RandomNameSource {
    fn next_name(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(Uuid::new_v4().as_bytes());
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        hasher.update(nanos.to_be_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Allocates and persists one event per run.
pub struct EventAllocator {
    events: Arc<dyn EventStore>,
    names: Arc<dyn NameSource>,
}

impl EventAllocator {
    pub fn new(events: Arc<dyn EventStore>) -> Self {
        Self::with_name_source(events, Arc::new(RandomNameSource))
    }

    pub fn with_name_source(events: Arc<dyn EventStore>, names: Arc<dyn NameSource>) -> Self {
        Self { events, names }
    }

    /// Generate names until one is unused, insert it enabled, and return the
    /// stored row.
    ///
    /// Name collisions are retried locally. Store failures are not retried.
    pub async fn allocate(&self) -> Result<Event, IngestError> {
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let name = self.names.next_name();

            if self.events.exists(&name).await?.is_some() {
                debug!(attempt, name = %name, "event name collision, regenerating");
                continue;
            }

            match self.events.insert(&name, true).await {
                Ok(()) => {}
                Err(e) if e.is_conflict() => {
                    debug!(attempt, name = %name, "event name taken on insert, regenerating");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            let event = self.events.exists(&name).await?.ok_or_else(|| StoreError::Corrupt {
                table: "events",
                reason: format!("event '{}' missing after insert", name),
            })?;

            info!(event_id = event.id, event = %event.name, "allocated event");
            return Ok(event);
        }

        Err(IngestError::EventNameExhausted {
            attempts: MAX_NAME_ATTEMPTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use crate::storage::{sqlite::test_pool, Stores};

    /// Replays a fixed list of names, then repeats the last one.
    struct ScriptedNames(Mutex<Vec<String>>);

    impl ScriptedNames {
        fn new(names: &[&str]) -> Arc<Self> {
            let mut names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
            names.reverse();
            Arc::new(Self(Mutex::new(names)))
        }
    }

    impl NameSource for ScriptedNames {
        fn next_name(&self) -> String {
            let mut names = self.0.lock().unwrap();
            if names.len() > 1 {
                names.pop().unwrap()
            } else {
                names[0].clone()
            }
        }
    }

    async fn stores() -> Stores {
        Stores::sqlite(test_pool().await).await.unwrap()
    }

    #[test]
    fn test_random_names_are_hex_sha256() {
        let source = RandomNameSource;
        let a = source.next_name();
        let b = source.next_name();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_allocate_persists_enabled_event() {
        let stores = stores().await;
        let allocator = EventAllocator::new(stores.events.clone());

        let event = allocator.allocate().await.expect("allocate failed");

        assert!(event.enabled);
        assert_eq!(stores.events.exists(&event.name).await.unwrap(), Some(event));
    }

    #[tokio::test]
    async fn test_allocate_retries_collisions() {
        let stores = stores().await;
        stores.events.insert("taken", true).await.unwrap();
        let allocator =
            EventAllocator::with_name_source(stores.events.clone(), ScriptedNames::new(&["taken", "taken", "fresh"]));

        let event = allocator.allocate().await.unwrap();

        assert_eq!(event.name, "fresh");
        assert_eq!(stores.events.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_allocate_gives_up_after_bounded_attempts() {
        let stores = stores().await;
        stores.events.insert("taken", true).await.unwrap();
        let allocator =
            EventAllocator::with_name_source(stores.events.clone(), ScriptedNames::new(&["taken"]));

        let err = allocator.allocate().await.unwrap_err();

        assert!(matches!(
            err,
            IngestError::EventNameExhausted {
                attempts: MAX_NAME_ATTEMPTS
            }
        ));
        assert_eq!(stores.events.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_allocated_names_unique() {
        let stores = stores().await;
        let allocator = EventAllocator::new(stores.events.clone());

        for _ in 0..20 {
            allocator.allocate().await.unwrap();
        }

        let events = stores.events.all().await.unwrap();
        let names: HashSet<_> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names.len(), 20);
    }
}

//! Zone storage interface.

use async_trait::async_trait;

use super::event_store::Result;

/// A named partition of the topology, scoped to the event that observed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    pub company_name: Option<String>,
    pub address_0: Option<String>,
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub enabled: bool,
}

/// Insert form of [`Zone`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewZone {
    pub event_id: i64,
    pub name: String,
    pub company_name: Option<String>,
    pub address_0: Option<String>,
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub enabled: bool,
}

impl NewZone {
    /// A zone carrying only its name; every descriptive field is unset.
    pub fn named(event_id: i64, name: impl Into<String>) -> Self {
        Self {
            event_id,
            name: name.into(),
            enabled: true,
            ..Default::default()
        }
    }
}

/// Interface for zone persistence.
///
/// `(event_id, name)` is unique. Inserting a duplicate is a no-op so that a
/// repeated resolution of the same zone inside one run stays idempotent.
#[async_trait]
pub trait ZoneStore: Send + Sync {
    async fn exists(&self, event_id: i64, name: &str) -> Result<Option<Zone>>;

    async fn insert(&self, zone: &NewZone) -> Result<()>;

    /// All zones belonging to an event, ordered by name.
    async fn zones(&self, event_id: i64) -> Result<Vec<Zone>>;
}

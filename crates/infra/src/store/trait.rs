use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use labinv_core::{DomainError, ItemId, LocationId};
use labinv_inventory::{Item, ItemWithLocation, Location, NewItem, NewLocation};

/// Store operation error.
///
/// Domain failures (validation, missing records, referential integrity) are
/// carried as [`DomainError`]; everything else is an infrastructure failure of
/// the backing medium.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Reading or writing the backing medium failed.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// The backing database could not be reached.
    #[error("connection failure: {0}")]
    Connection(String),
}

impl StoreError {
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Domain error carried by this failure, if any.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(format!("io: {err}"))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(format!("json: {err}"))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(format!("database: {err}"))
    }
}

/// Sole owner of the item and location collections.
///
/// All mutations pass through it and all reads are served from it. Every
/// backend must:
/// - validate payloads against its configured `Limits`
/// - reject items whose `location_id` does not resolve (`InvalidReference`)
/// - refuse to delete a location that is still referenced (`InUse`)
/// - allocate ids that are never reused
/// - make a mutation durable before reporting success, leaving prior state
///   intact when the durable write fails
/// - never expose a partially-applied mutation to readers
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Short backend name (`memory`, `file`, `postgres`).
    fn backend(&self) -> &'static str;

    /// Snapshot of all items.
    async fn list_items(&self) -> Result<Vec<Item>, StoreError>;

    /// Snapshot of all locations.
    async fn list_locations(&self) -> Result<Vec<Location>, StoreError>;

    async fn get_item(&self, id: ItemId) -> Result<Item, StoreError>;

    async fn get_location(&self, id: LocationId) -> Result<Location, StoreError>;

    async fn create_item(&self, new: NewItem) -> Result<Item, StoreError>;

    async fn create_location(&self, new: NewLocation) -> Result<Location, StoreError>;

    /// Replace all mutable fields of an existing item.
    async fn update_item(&self, id: ItemId, update: NewItem) -> Result<Item, StoreError>;

    async fn delete_item(&self, id: ItemId) -> Result<(), StoreError>;

    async fn delete_location(&self, id: LocationId) -> Result<(), StoreError>;

    /// Case-insensitive substring search on item names; a blank query
    /// returns every item.
    async fn search_items(&self, query: &str) -> Result<Vec<Item>, StoreError>;

    /// Every item joined to its location name.
    async fn items_with_locations(&self) -> Result<Vec<ItemWithLocation>, StoreError>;
}

#[async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        (**self).list_items().await
    }

    async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        (**self).list_locations().await
    }

    async fn get_item(&self, id: ItemId) -> Result<Item, StoreError> {
        (**self).get_item(id).await
    }

    async fn get_location(&self, id: LocationId) -> Result<Location, StoreError> {
        (**self).get_location(id).await
    }

    async fn create_item(&self, new: NewItem) -> Result<Item, StoreError> {
        (**self).create_item(new).await
    }

    async fn create_location(&self, new: NewLocation) -> Result<Location, StoreError> {
        (**self).create_location(new).await
    }

    async fn update_item(&self, id: ItemId, update: NewItem) -> Result<Item, StoreError> {
        (**self).update_item(id, update).await
    }

    async fn delete_item(&self, id: ItemId) -> Result<(), StoreError> {
        (**self).delete_item(id).await
    }

    async fn delete_location(&self, id: LocationId) -> Result<(), StoreError> {
        (**self).delete_location(id).await
    }

    async fn search_items(&self, query: &str) -> Result<Vec<Item>, StoreError> {
        (**self).search_items(query).await
    }

    async fn items_with_locations(&self) -> Result<Vec<ItemWithLocation>, StoreError> {
        (**self).items_with_locations().await
    }
}

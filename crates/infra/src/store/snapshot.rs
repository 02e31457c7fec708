//! Lock-guarded, in-process store over an [`InventoryDocument`].
//!
//! Reads take the shared lock and clone what they return. Mutations take the
//! exclusive lock, apply the change to a staged copy of the document, hand
//! the staged copy to the [`Persistence`] sink and only swap it in once the
//! sink reports success. A failed write therefore leaves the previous state
//! in place, both in memory and on the medium.

use std::sync::{RwLock, RwLockReadGuard};

use async_trait::async_trait;
use chrono::Utc;

use labinv_core::{DomainError, DomainResult, ItemId, LocationId};
use labinv_inventory::{Item, ItemWithLocation, Limits, Location, NewItem, NewLocation};

use super::document::InventoryDocument;
use super::r#trait::{InventoryStore, StoreError};

/// Durable sink for committed documents.
pub trait Persistence: Send + Sync {
    /// Backend name reported by [`InventoryStore::backend`].
    fn backend(&self) -> &'static str;

    /// Durably write `doc`; called with the exclusive lock held.
    fn save(&self, doc: &InventoryDocument) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub struct SnapshotStore<P> {
    state: RwLock<InventoryDocument>,
    limits: Limits,
    sink: P,
}

impl<P: Persistence> SnapshotStore<P> {
    pub(crate) fn from_parts(mut doc: InventoryDocument, limits: Limits, sink: P) -> Self {
        doc.normalize_counters();
        Self {
            state: RwLock::new(doc),
            limits,
            sink,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    /// Write the committed document through the sink as-is.
    pub(crate) fn persist_current(&self) -> Result<(), StoreError> {
        let state = self
            .state
            .write()
            .map_err(|_| StoreError::persistence("lock poisoned"))?;
        self.sink.save(&state)
    }

    /// Clone of the current committed document.
    pub fn snapshot(&self) -> Result<InventoryDocument, StoreError> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, InventoryDocument>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::persistence("lock poisoned"))
    }

    pub(crate) fn commit<T>(
        &self,
        op: &'static str,
        apply: impl FnOnce(&mut InventoryDocument) -> DomainResult<T>,
    ) -> Result<T, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::persistence("lock poisoned"))?;

        let mut staged = state.clone();
        let out = apply(&mut staged)?;

        if let Err(e) = self.sink.save(&staged) {
            tracing::error!(backend = self.sink.backend(), op, error = %e, "persist failed; mutation discarded");
            return Err(e);
        }

        *state = staged;
        Ok(out)
    }
}

#[async_trait]
impl<P: Persistence> InventoryStore for SnapshotStore<P> {
    fn backend(&self) -> &'static str {
        self.sink.backend()
    }

    async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.read()?.items.clone())
    }

    async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        Ok(self.read()?.locations.clone())
    }

    async fn get_item(&self, id: ItemId) -> Result<Item, StoreError> {
        let state = self.read()?;
        state
            .item(id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("item").into())
    }

    async fn get_location(&self, id: LocationId) -> Result<Location, StoreError> {
        let state = self.read()?;
        state
            .location(id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("location").into())
    }

    async fn create_item(&self, new: NewItem) -> Result<Item, StoreError> {
        let new = new.validated(&self.limits)?;
        let item = self.commit("create_item", |doc| doc.create_item(new, Utc::now()))?;
        tracing::info!(item_id = %item.id, location_id = %item.location_id, "item created");
        Ok(item)
    }

    async fn create_location(&self, new: NewLocation) -> Result<Location, StoreError> {
        let new = new.validated(&self.limits)?;
        let location = self.commit("create_location", |doc| doc.create_location(new, Utc::now()))?;
        tracing::info!(location_id = %location.id, "location created");
        Ok(location)
    }

    async fn update_item(&self, id: ItemId, update: NewItem) -> Result<Item, StoreError> {
        let limits = self.limits;
        // Missing item wins over a bad payload, matching the SQL backend.
        let item = self.commit("update_item", |doc| {
            if doc.item(id).is_none() {
                return Err(DomainError::not_found("item"));
            }
            doc.update_item(id, update.validated(&limits)?, Utc::now())
        })?;
        tracing::info!(item_id = %item.id, "item updated");
        Ok(item)
    }

    async fn delete_item(&self, id: ItemId) -> Result<(), StoreError> {
        self.commit("delete_item", |doc| doc.delete_item(id))?;
        tracing::info!(item_id = %id, "item deleted");
        Ok(())
    }

    async fn delete_location(&self, id: LocationId) -> Result<(), StoreError> {
        self.commit("delete_location", |doc| doc.delete_location(id))?;
        tracing::info!(location_id = %id, "location deleted");
        Ok(())
    }

    async fn search_items(&self, query: &str) -> Result<Vec<Item>, StoreError> {
        Ok(self.read()?.search_items(query))
    }

    async fn items_with_locations(&self) -> Result<Vec<ItemWithLocation>, StoreError> {
        Ok(self.read()?.items_with_locations())
    }
}

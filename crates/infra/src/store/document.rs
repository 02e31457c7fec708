//! The whole inventory as one value: both collections plus id counters.
//!
//! This is what the file backend serializes, and what the snapshot store
//! stages mutations on. All operations here are pure; locking and durability
//! are the caller's concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labinv_core::{DomainError, DomainResult, Entity, ItemId, LocationId};
use labinv_inventory::{Item, ItemWithLocation, Location, NewItem, NewLocation};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryDocument {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub locations: Vec<Location>,
    /// High-water marks; persisted so deleted ids stay retired across restarts.
    #[serde(default)]
    next_item_id: u64,
    #[serde(default)]
    next_location_id: u64,
}

impl InventoryDocument {
    pub fn new() -> Self {
        let mut doc = Self::default();
        doc.normalize_counters();
        doc
    }

    /// Raise the counters to at least one past the largest existing id.
    ///
    /// Run after loading a document from any source.
    pub fn normalize_counters(&mut self) {
        let max_item = self.items.iter().map(|i| i.id.get()).max().unwrap_or(0);
        let max_location = self.locations.iter().map(|l| l.id.get()).max().unwrap_or(0);
        // Saturates at u64::MAX; allocation then refuses instead of reusing it.
        self.next_item_id = self.next_item_id.max(max_item.saturating_add(1)).max(1);
        self.next_location_id = self
            .next_location_id
            .max(max_location.saturating_add(1))
            .max(1);
    }

    pub fn next_item_id(&self) -> ItemId {
        ItemId::new(self.next_item_id)
    }

    pub fn next_location_id(&self) -> LocationId {
        LocationId::new(self.next_location_id)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        position(&self.items, id).map(|idx| &self.items[idx])
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        position(&self.locations, id).map(|idx| &self.locations[idx])
    }

    fn ensure_location(&self, id: LocationId) -> DomainResult<()> {
        match self.location(id) {
            Some(_) => Ok(()),
            None => Err(DomainError::invalid_reference(format!(
                "location {id} does not exist"
            ))),
        }
    }

    /// `new` must already be validated.
    pub fn create_item(&mut self, new: NewItem, now: DateTime<Utc>) -> DomainResult<Item> {
        self.ensure_location(new.location_id)?;

        let id = self.next_item_id();
        self.next_item_id = id.next().ok_or_else(id_space_exhausted)?.get();

        let item = Item::from_new(id, new, now);
        self.items.push(item.clone());
        Ok(item)
    }

    /// `new` must already be validated.
    pub fn create_location(&mut self, new: NewLocation, now: DateTime<Utc>) -> DomainResult<Location> {
        let id = self.next_location_id();
        self.next_location_id = id.next().ok_or_else(id_space_exhausted)?.get();

        let location = Location::from_new(id, new, now);
        self.locations.push(location.clone());
        Ok(location)
    }

    /// `update` must already be validated.
    pub fn update_item(
        &mut self,
        id: ItemId,
        update: NewItem,
        now: DateTime<Utc>,
    ) -> DomainResult<Item> {
        let idx = position(&self.items, id).ok_or(DomainError::not_found("item"))?;
        self.ensure_location(update.location_id)?;

        let item = &mut self.items[idx];
        item.replace(update, now);
        Ok(item.clone())
    }

    pub fn delete_item(&mut self, id: ItemId) -> DomainResult<Item> {
        let idx = position(&self.items, id).ok_or(DomainError::not_found("item"))?;
        Ok(self.items.remove(idx))
    }

    pub fn delete_location(&mut self, id: LocationId) -> DomainResult<Location> {
        let idx = position(&self.locations, id).ok_or(DomainError::not_found("location"))?;

        let in_use = self.items.iter().filter(|i| i.location_id == id).count();
        if in_use > 0 {
            return Err(DomainError::in_use(format!(
                "location {id} is still referenced by {in_use} item(s)"
            )));
        }

        Ok(self.locations.remove(idx))
    }

    pub fn search_items(&self, query: &str) -> Vec<Item> {
        let needle = query.to_lowercase();
        self.items
            .iter()
            .filter(|i| i.name_matches(&needle))
            .cloned()
            .collect()
    }

    pub fn items_with_locations(&self) -> Vec<ItemWithLocation> {
        self.items
            .iter()
            .map(|i| i.with_location(self.location(i.location_id).map(Entity::name)))
            .collect()
    }
}

fn id_space_exhausted() -> DomainError {
    DomainError::validation("id space exhausted")
}

fn position<E: Entity>(rows: &[E], id: E::Id) -> Option<usize> {
    rows.iter().position(|row| row.id() == id)
}

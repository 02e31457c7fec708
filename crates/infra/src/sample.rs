//! Starter inventory for a fresh installation.

use labinv_inventory::{NewItem, NewLocation};

use crate::store::{InventoryStore, StoreError};

pub const SAMPLE_LOCATIONS: [&str; 3] = ["Storage Room", "Assembly Room", "Electronics"];

/// `(name, index into SAMPLE_LOCATIONS, price, quantity)`
pub const SAMPLE_ITEMS: [(&str, usize, f64, u32); 5] = [
    ("Plywood 2mm 900x600mm Sheet", 0, 11.15, 25),
    ("MDF 4mm 900x600mm Sheet", 0, 5.67, 18),
    ("Acrylic 5mm 900x600mm Sheet", 0, 19.34, 12),
    ("Wood Glue", 1, 9.0, 8),
    ("Resistor SMT 200", 2, 0.2, 150),
];

/// Seed the sample locations and items when the store holds neither.
///
/// Returns whether anything was written. A store with existing data is left
/// untouched.
pub async fn seed_if_empty(store: &dyn InventoryStore) -> Result<bool, StoreError> {
    if !store.list_locations().await?.is_empty() || !store.list_items().await?.is_empty() {
        return Ok(false);
    }

    let mut location_ids = Vec::with_capacity(SAMPLE_LOCATIONS.len());
    for name in SAMPLE_LOCATIONS {
        let location = store.create_location(NewLocation::new(name)).await?;
        location_ids.push(location.id);
    }

    for (name, location, price, number) in SAMPLE_ITEMS {
        store
            .create_item(NewItem::new(name, location_ids[location], price).with_number(number))
            .await?;
    }

    tracing::debug!(
        locations = SAMPLE_LOCATIONS.len(),
        items = SAMPLE_ITEMS.len(),
        "sample inventory written"
    );
    Ok(true)
}

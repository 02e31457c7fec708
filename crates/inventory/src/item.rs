use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labinv_core::{DomainResult, Entity, ItemId, LocationId};

use crate::Limits;

/// Location name shown when an item's location cannot be resolved.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// A trackable inventory unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub location_id: LocationId,
    pub price: f64,
    /// Quantity on hand, when tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    pub modified: DateTime<Utc>,
}

impl Item {
    /// Build an item from an already validated payload.
    pub fn from_new(id: ItemId, new: NewItem, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            location_id: new.location_id,
            price: new.price,
            number: new.number,
            modified: now,
        }
    }

    /// Replace every mutable field and refresh the timestamp.
    pub fn replace(&mut self, update: NewItem, now: DateTime<Utc>) {
        self.name = update.name;
        self.location_id = update.location_id;
        self.price = update.price;
        self.number = update.number;
        self.modified = now;
    }

    /// Case-insensitive substring match on the name.
    ///
    /// `needle` must already be lowercased.
    pub fn name_matches(&self, needle: &str) -> bool {
        needle.is_empty() || self.name.to_lowercase().contains(needle)
    }

    pub fn with_location(&self, location_name: Option<&str>) -> ItemWithLocation {
        ItemWithLocation {
            id: self.id,
            name: self.name.clone(),
            location: location_name.unwrap_or(UNKNOWN_LOCATION).to_string(),
            price: self.price,
            number: self.number,
            modified: self.modified,
        }
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Payload: create an item, or replace all of its mutable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub location_id: LocationId,
    pub price: f64,
    #[serde(default)]
    pub number: Option<u32>,
}

impl NewItem {
    pub fn new(name: impl Into<String>, location_id: LocationId, price: f64) -> Self {
        Self {
            name: name.into(),
            location_id,
            price,
            number: None,
        }
    }

    pub fn with_number(mut self, number: u32) -> Self {
        self.number = Some(number);
        self
    }

    /// Validate and normalize (trimmed name). Location existence is checked
    /// by the store, which owns the location collection.
    pub fn validated(self, limits: &Limits) -> DomainResult<Self> {
        Ok(Self {
            name: limits.check_name("item name", &self.name)?,
            location_id: self.location_id,
            price: limits.check_price(self.price)?,
            number: limits.check_number(self.number)?,
        })
    }
}

/// Display view: an item joined to its location's name. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemWithLocation {
    pub id: ItemId,
    pub name: String,
    pub location: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    pub modified: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use labinv_core::DomainError;

    fn hammer() -> Item {
        let new = NewItem::new("Hammer", LocationId::new(1), 9.99);
        Item::from_new(ItemId::new(1), new, Utc::now())
    }

    #[test]
    fn validated_rejects_empty_name_and_negative_price() {
        let limits = Limits::default();
        let err = NewItem::new("", LocationId::new(1), 1.0).validated(&limits).unwrap_err();
        assert_eq!(err, DomainError::validation("item name cannot be empty"));

        let err = NewItem::new("Saw", LocationId::new(1), -1.0).validated(&limits).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn replace_overwrites_all_mutable_fields() {
        let mut item = hammer();
        let later = item.modified + chrono::Duration::seconds(5);
        item.replace(
            NewItem::new("Claw Hammer", LocationId::new(2), 12.5).with_number(3),
            later,
        );

        assert_eq!(item.id, ItemId::new(1));
        assert_eq!(item.name, "Claw Hammer");
        assert_eq!(item.location_id, LocationId::new(2));
        assert_eq!(item.price, 12.5);
        assert_eq!(item.number, Some(3));
        assert_eq!(item.modified, later);
    }

    #[test]
    fn with_location_falls_back_to_unknown() {
        let item = hammer();
        assert_eq!(item.with_location(Some("Bench")).location, "Bench");
        assert_eq!(item.with_location(None).location, UNKNOWN_LOCATION);
    }

    #[test]
    fn number_is_optional_on_the_wire() {
        let json = serde_json::json!({ "name": "Glue", "location_id": 4, "price": 9.0 });
        let new: NewItem = serde_json::from_value(json).unwrap();
        assert_eq!(new.number, None);

        let item = hammer();
        let value = serde_json::to_value(&item).unwrap();
        assert!(value.get("number").is_none());
        assert_eq!(value["location_id"], 1);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: matching ignores case on both sides.
            #[test]
            fn name_match_is_case_insensitive(
                prefix in "[a-z ]{0,8}",
                word in "[A-Za-z]{1,8}",
                suffix in "[a-z ]{0,8}"
            ) {
                let mut item = hammer();
                item.name = format!("{prefix}{}{suffix}", word.to_uppercase());
                prop_assert!(item.name_matches(&word.to_lowercase()));
            }
        }
    }
}

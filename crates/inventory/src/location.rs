use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labinv_core::{DomainResult, Entity, LocationId};

use crate::Limits;

/// A named physical place where items are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub modified: DateTime<Utc>,
}

impl Location {
    /// Build a location from an already validated payload.
    pub fn from_new(id: LocationId, new: NewLocation, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            modified: now,
        }
    }
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> LocationId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Payload: create a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
}

impl NewLocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Validate and normalize (trimmed name).
    pub fn validated(self, limits: &Limits) -> DomainResult<Self> {
        Ok(Self {
            name: limits.check_name("location name", &self.name)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labinv_core::DomainError;

    #[test]
    fn empty_location_name_is_rejected() {
        let err = NewLocation::new(" ").validated(&Limits::default()).unwrap_err();
        assert_eq!(err, DomainError::validation("location name cannot be empty"));
    }

    #[test]
    fn from_new_keeps_validated_name() {
        let now = Utc::now();
        let new = NewLocation::new(" Bench ").validated(&Limits::default()).unwrap();
        let location = Location::from_new(LocationId::new(1), new, now);
        assert_eq!(location.name(), "Bench");
        assert_eq!(location.id(), LocationId::new(1));
        assert_eq!(location.modified, now);
    }
}

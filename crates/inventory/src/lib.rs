//! Inventory domain module.
//!
//! This crate contains the entity model and its validation rules, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod item;
pub mod limits;
pub mod location;

pub use item::{Item, ItemWithLocation, NewItem, UNKNOWN_LOCATION};
pub use limits::Limits;
pub use location::{Location, NewLocation};

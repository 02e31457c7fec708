use labinv_inventory::Limits;

use super::document::InventoryDocument;
use super::snapshot::{Persistence, SnapshotStore};
use super::r#trait::StoreError;

/// Sink that keeps nothing: committed state lives only in memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct Volatile;

impl Persistence for Volatile {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn save(&self, _doc: &InventoryDocument) -> Result<(), StoreError> {
        Ok(())
    }
}

/// In-memory store.
///
/// Intended for tests/dev; state is lost when the process exits.
pub type InMemoryStore = SnapshotStore<Volatile>;

impl SnapshotStore<Volatile> {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self::from_parts(InventoryDocument::new(), limits, Volatile)
    }

    /// Start from an existing document (counters are normalized).
    pub fn from_document(doc: InventoryDocument, limits: Limits) -> Self {
        Self::from_parts(doc, limits, Volatile)
    }
}

impl Default for SnapshotStore<Volatile> {
    fn default() -> Self {
        Self::new()
    }
}

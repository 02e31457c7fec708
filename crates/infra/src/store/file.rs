//! JSON-file backed store.
//!
//! The whole inventory lives in one document, `<data_dir>/inventory.json`:
//!
//! ```json
//! { "items": [...], "locations": [...], "next_item_id": 6, "next_location_id": 4 }
//! ```
//!
//! The document is rewritten wholesale on every mutation. Writes go to a
//! sibling temp file which is fsynced and then renamed over the target, so a
//! crash or a failed write never leaves a truncated document behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use labinv_inventory::Limits;

use super::document::InventoryDocument;
use super::snapshot::{Persistence, SnapshotStore};
use super::r#trait::StoreError;

pub const INVENTORY_FILE_NAME: &str = "inventory.json";

/// Sink that writes committed documents to a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
    staging_path: PathBuf,
}

impl JsonFile {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(INVENTORY_FILE_NAME),
            staging_path: data_dir.join(format!("{INVENTORY_FILE_NAME}.tmp")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; `None` when the file does not exist yet.
    pub fn load(&self) -> Result<Option<InventoryDocument>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let doc: InventoryDocument = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::persistence(format!("{} is not a valid inventory: {e}", self.path.display()))
        })?;
        Ok(Some(doc))
    }
}

impl Persistence for JsonFile {
    fn backend(&self) -> &'static str {
        "file"
    }

    fn save(&self, doc: &InventoryDocument) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(doc)?;

        let mut staging = fs::File::create(&self.staging_path)?;
        staging.write_all(&bytes)?;
        staging.sync_all()?;
        drop(staging);

        fs::rename(&self.staging_path, &self.path)?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "inventory written");
        Ok(())
    }
}

/// Store persisted to `<data_dir>/inventory.json`.
pub type FileStore = SnapshotStore<JsonFile>;

impl SnapshotStore<JsonFile> {
    /// Open (or create) the store in `data_dir`.
    ///
    /// A missing file starts an empty inventory and writes it out immediately,
    /// so a misconfigured directory fails at startup rather than on the first
    /// mutation.
    pub fn open(data_dir: impl AsRef<Path>, limits: Limits) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).map_err(|e| {
            StoreError::persistence(format!("cannot create {}: {e}", data_dir.display()))
        })?;

        let sink = JsonFile::new(data_dir);
        let (doc, fresh) = match sink.load()? {
            Some(doc) => (doc, false),
            None => (InventoryDocument::new(), true),
        };

        let store = Self::from_parts(doc, limits, sink);
        if fresh {
            store.persist_current()?;
        }

        let doc = store.snapshot()?;
        tracing::info!(
            path = %store.path().display(),
            items = doc.items.len(),
            locations = doc.locations.len(),
            "file store opened"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        self.sink().path()
    }
}

#[cfg(test)]
mod tests {
    use labinv_core::{DomainError, ItemId};
    use labinv_inventory::{NewItem, NewLocation};

    use super::*;
    use crate::store::InventoryStore;

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn fresh_directory_gets_an_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("data"), Limits::default()).unwrap();

        let json = read_json(store.path());
        assert_eq!(json["items"], serde_json::json!([]));
        assert_eq!(json["locations"], serde_json::json!([]));
        assert_eq!(store.backend(), "file");
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let (bench, hammer) = {
            let store = FileStore::open(dir.path(), Limits::default()).unwrap();
            let bench = store.create_location(NewLocation::new("Bench")).await.unwrap();
            let hammer = store
                .create_item(NewItem::new("Hammer", bench.id, 9.99).with_number(1))
                .await
                .unwrap();
            (bench, hammer)
        };

        let store = FileStore::open(dir.path(), Limits::default()).unwrap();
        assert_eq!(store.get_location(bench.id).await.unwrap(), bench);
        assert_eq!(store.get_item(hammer.id).await.unwrap(), hammer);
    }

    #[tokio::test]
    async fn deleted_highest_id_stays_retired_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path(), Limits::default()).unwrap();
            let bench = store.create_location(NewLocation::new("Bench")).await.unwrap();
            for name in ["a", "b", "c"] {
                store.create_item(NewItem::new(name, bench.id, 1.0)).await.unwrap();
            }
            store.delete_item(ItemId::new(3)).await.unwrap();
        }

        let store = FileStore::open(dir.path(), Limits::default()).unwrap();
        let bench = store.list_locations().await.unwrap()[0].id;
        let next = store.create_item(NewItem::new("d", bench, 1.0)).await.unwrap();
        assert_eq!(next.id, ItemId::new(4));
    }

    #[tokio::test]
    async fn failed_write_keeps_memory_and_disk_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), Limits::default()).unwrap();
        let bench = store.create_location(NewLocation::new("Bench")).await.unwrap();
        let before = fs::read(store.path()).unwrap();

        // A directory where the staging file should go makes the write fail.
        let staging = dir.path().join(format!("{INVENTORY_FILE_NAME}.tmp"));
        fs::create_dir(&staging).unwrap();

        let err = store
            .create_item(NewItem::new("Hammer", bench.id, 9.99))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));
        assert!(store.list_items().await.unwrap().is_empty());
        assert_eq!(fs::read(store.path()).unwrap(), before);

        // The failed create must not have consumed an id either.
        fs::remove_dir(&staging).unwrap();
        let item = store.create_item(NewItem::new("Hammer", bench.id, 9.99)).await.unwrap();
        assert_eq!(item.id, ItemId::new(1));
    }

    #[tokio::test]
    async fn domain_failures_do_not_touch_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), Limits::default()).unwrap();
        let bench = store.create_location(NewLocation::new("Bench")).await.unwrap();
        store.create_item(NewItem::new("Hammer", bench.id, 9.99)).await.unwrap();
        let before = fs::read(store.path()).unwrap();

        let err = store.delete_location(bench.id).await.unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::InUse(_))));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn corrupt_document_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(INVENTORY_FILE_NAME), b"{ not json").unwrap();

        let err = FileStore::open(dir.path(), Limits::default()).unwrap_err();
        assert!(matches!(err, StoreError::Persistence(msg) if msg.contains("not a valid inventory")));
    }

    #[tokio::test]
    async fn largest_possible_id_on_disk_opens_and_refuses_new_ids() {
        let dir = tempfile::tempdir().unwrap();
        let doc = serde_json::json!({
            "items": [],
            "locations": [
                { "id": u64::MAX, "name": "Edge", "modified": "2024-03-01T10:00:00Z" }
            ]
        });
        fs::write(dir.path().join(INVENTORY_FILE_NAME), doc.to_string()).unwrap();

        let store = FileStore::open(dir.path(), Limits::default()).unwrap();
        let err = store.create_location(NewLocation::new("Next")).await.unwrap_err();
        assert_eq!(err.domain(), Some(&DomainError::validation("id space exhausted")));
        assert_eq!(store.list_locations().await.unwrap().len(), 1);
    }

    #[test]
    fn documents_without_counters_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = serde_json::json!({
            "items": [{
                "id": 5, "name": "Wood Glue", "location_id": 2, "price": 9.0,
                "modified": "2024-03-01T10:00:00Z"
            }],
            "locations": [{ "id": 2, "name": "Assembly Room", "modified": "2024-03-01T10:00:00Z" }]
        });
        fs::write(dir.path().join(INVENTORY_FILE_NAME), legacy.to_string()).unwrap();

        let store = FileStore::open(dir.path(), Limits::default()).unwrap();
        let doc = store.snapshot().unwrap();
        assert_eq!(doc.next_item_id(), ItemId::new(6));
        assert_eq!(doc.items[0].number, None);
    }
}

//! Inventory storage.
//!
//! [`InventoryStore`] is the single contract both adapters program against.
//! Three backends implement it:
//!
//! - [`InMemoryStore`]: volatile, for tests and demos
//! - [`FileStore`]: one JSON document on disk
//! - [`PostgresStore`]: two tables with a foreign key
//!
//! [`open_store`] picks one from [`StoreConfig`].

use std::sync::Arc;

use labinv_inventory::Limits;

use crate::config::{StoreBackend, StoreConfig};
use crate::sample;

pub mod document;
pub mod file;
pub mod in_memory;
pub mod postgres;
pub mod snapshot;
pub mod r#trait;

pub use document::InventoryDocument;
pub use file::{FileStore, JsonFile, INVENTORY_FILE_NAME};
pub use in_memory::{InMemoryStore, Volatile};
pub use postgres::PostgresStore;
pub use snapshot::{Persistence, SnapshotStore};
pub use r#trait::{InventoryStore, StoreError};

/// Open the configured backend, seeding sample data into an empty store when
/// enabled.
///
/// Any failure here is fatal to the caller: neither adapter can run without
/// its store.
pub async fn open_store(
    config: &StoreConfig,
    limits: Limits,
) -> Result<Arc<dyn InventoryStore>, StoreError> {
    let store: Arc<dyn InventoryStore> = match config.backend {
        StoreBackend::Memory => Arc::new(InMemoryStore::with_limits(limits)),
        StoreBackend::File => Arc::new(FileStore::open(&config.data_dir, limits)?),
        StoreBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .ok_or_else(|| StoreError::connection("DATABASE_URL is not configured"))?;
            Arc::new(PostgresStore::connect(pg, limits).await?)
        }
    };

    if config.seed_sample_data && sample::seed_if_empty(store.as_ref()).await? {
        tracing::info!(backend = store.backend(), "seeded sample data");
    }

    tracing::info!(backend = store.backend(), "store opened");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[tokio::test]
    async fn memory_backend_is_seeded_by_default() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            ..StoreConfig::default()
        };
        let store = open_store(&config, Limits::default()).await.unwrap();
        assert_eq!(store.backend(), "memory");
        assert_eq!(store.list_locations().await.unwrap().len(), 3);
        assert_eq!(store.list_items().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn file_backend_reopens_without_reseeding() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::File,
            data_dir: PathBuf::from(dir.path()),
            postgres: None,
            seed_sample_data: true,
        };

        let store = open_store(&config, Limits::default()).await.unwrap();
        let first = store.list_items().await.unwrap();
        store.delete_item(first[0].id).await.unwrap();
        drop(store);

        let store = open_store(&config, Limits::default()).await.unwrap();
        assert_eq!(store.backend(), "file");
        assert_eq!(store.list_items().await.unwrap().len(), first.len() - 1);
    }

    #[tokio::test]
    async fn postgres_without_url_is_a_connection_error() {
        let config = StoreConfig {
            backend: StoreBackend::Postgres,
            ..StoreConfig::default()
        };
        let err = open_store(&config, Limits::default()).await.err().unwrap();
        assert!(matches!(err, StoreError::Connection(_)));
    }
}

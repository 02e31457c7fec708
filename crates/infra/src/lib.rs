//! Infrastructure layer: storage backends, configuration, sample data.

pub mod config;
pub mod sample;
pub mod store;

pub use config::{AppConfig, ConfigError, PostgresConfig, StoreBackend, StoreConfig};
pub use store::{
    open_store, FileStore, InMemoryStore, InventoryStore, PostgresStore, StoreError,
};

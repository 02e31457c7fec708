//! HTTP API application wiring.
//!
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: query/response shapes that are not domain types
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use labinv_infra::InventoryStore;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Shared store handle injected into every handler.
pub type SharedStore = Arc<dyn InventoryStore>;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(store: SharedStore) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router())
        .fallback(routes::system::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_id))
                .layer(axum::middleware::from_fn(middleware::cors))
                .layer(Extension(store)),
        )
}

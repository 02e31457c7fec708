use axum::{routing::get, Router};

pub mod items;
pub mod locations;
pub mod system;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new()
        .nest("/items", items::router())
        .nest("/locations", locations::router())
        .route("/search", get(items::search_items))
        .route("/items-with-locations", get(items::items_with_locations))
}

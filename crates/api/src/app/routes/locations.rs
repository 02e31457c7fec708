use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use labinv_core::LocationId;
use labinv_inventory::NewLocation;

use crate::app::{errors, SharedStore};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_locations).post(create_location))
        .route("/:id", get(get_location).delete(delete_location))
}

fn parse_id(raw: &str) -> Result<LocationId, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub async fn list_locations(Extension(store): Extension<SharedStore>) -> axum::response::Response {
    match store.list_locations().await {
        Ok(locations) => (StatusCode::OK, Json(locations)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_location(
    Extension(store): Extension<SharedStore>,
    body: Result<Json<NewLocation>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match store.create_location(body).await {
        Ok(location) => (StatusCode::OK, Json(location)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_location(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match store.get_location(id).await {
        Ok(location) => (StatusCode::OK, Json(location)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Refused with 400 while any item still points at the location.
pub async fn delete_location(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match store.delete_location(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

use axum::{extract::Extension, http::StatusCode, Json};

use crate::app::{dto, errors, SharedStore};

pub async fn health(Extension(store): Extension<SharedStore>) -> (StatusCode, Json<dto::HealthResponse>) {
    (
        StatusCode::OK,
        Json(dto::HealthResponse {
            status: "ok",
            backend: store.backend(),
        }),
    )
}

pub async fn not_found() -> axum::response::Response {
    errors::json_error(StatusCode::NOT_FOUND, "not_found", "no such route")
}

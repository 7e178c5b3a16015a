//! Item service HTTP surface.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

use crate::items::service::ItemsService;

pub fn items_router(service: Arc<ItemsService>) -> Router {
    Router::new()
        .route("/items/{id}", get(get_item))
        .with_state(service)
}

async fn get_item(State(service): State<Arc<ItemsService>>, Path(id): Path<String>) -> Json<Value> {
    Json(service.get_item(&id).await)
}

//! Root status endpoint shared by every role.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

/// What `GET /` reports.
#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub message: String,
    pub config_uri: String,
}

pub fn status_router(info: Arc<StatusInfo>) -> Router {
    Router::new().route("/", get(status)).with_state(info)
}

async fn status(State(info): State<Arc<StatusInfo>>) -> Json<Value> {
    Json(json!({
        "message": info.message,
        "config.uri": info.config_uri,
    }))
}

//! Counter service HTTP surface.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::counter::store::{CounterStore, CounterView};

pub fn counter_router(store: Arc<CounterStore>) -> Router {
    Router::new()
        .route("/counters", get(list_counters).delete(reset_all))
        .route(
            "/counters/{key}",
            get(get_counter).post(increment_counter).delete(reset_counter),
        )
        .with_state(store)
}

/// Increment and report the stored value after the increment.
async fn increment_counter(
    State(store): State<Arc<CounterStore>>,
    Path(key): Path<String>,
) -> Json<CounterView> {
    let previous = store.increment(&key);
    Json(CounterView {
        name: key,
        value: previous.wrapping_add(1),
    })
}

async fn get_counter(
    State(store): State<Arc<CounterStore>>,
    Path(key): Path<String>,
) -> Json<CounterView> {
    let value = store.get(&key);
    Json(CounterView { name: key, value })
}

async fn reset_counter(
    State(store): State<Arc<CounterStore>>,
    Path(key): Path<String>,
) -> Json<CounterView> {
    let value = store.reset(&key);
    Json(CounterView { name: key, value })
}

async fn list_counters(State(store): State<Arc<CounterStore>>) -> Json<Vec<CounterView>> {
    Json(store.list())
}

async fn reset_all(State(store): State<Arc<CounterStore>>) -> StatusCode {
    store.reset_all();
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_counter_surface() {
        let app = counter_router(Arc::new(CounterStore::new()));

        let (_, body) = call(&app, "POST", "/counters/m1-service").await;
        assert_eq!(body, serde_json::json!({"name": "m1-service", "value": 1}));

        let (_, body) = call(&app, "POST", "/counters/m1-service").await;
        assert_eq!(body["value"], 2);

        let (_, body) = call(&app, "GET", "/counters/m1-service").await;
        assert_eq!(body["value"], 2);

        let (_, body) = call(&app, "GET", "/counters/fresh").await;
        assert_eq!(body, serde_json::json!({"name": "fresh", "value": 0}));

        let (_, body) = call(&app, "DELETE", "/counters/m1-service").await;
        assert_eq!(body, serde_json::json!({"name": "m1-service", "value": 0}));

        let (_, body) = call(&app, "GET", "/counters").await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reset_all_endpoint() {
        let store = Arc::new(CounterStore::new());
        store.increment("a");
        let app = counter_router(store.clone());

        let (status, _) = call(&app, "DELETE", "/counters").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(store.get("a"), 0);
    }

    #[tokio::test]
    async fn test_increment_at_max_wraps_like_store() {
        let store = Arc::new(CounterStore::new());
        store.set("edge", i64::MAX);
        let app = counter_router(store.clone());

        let (status, body) = call(&app, "POST", "/counters/edge").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["value"], i64::MIN);
        assert_eq!(store.get("edge"), i64::MIN);
    }
}

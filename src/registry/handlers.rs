//! Registry server HTTP surface.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::registry::instance::{Registration, ServiceInstance};
use crate::registry::table::InstanceTable;

pub fn registry_router(table: Arc<InstanceTable>) -> Router {
    Router::new()
        .route("/registry/instances", post(register))
        .route("/registry/instances/{name}/{address}", delete(deregister))
        .route("/registry/services", get(list_services))
        .route("/registry/services/{name}", get(resolve))
        .with_state(table)
}

async fn register(
    State(table): State<Arc<InstanceTable>>,
    Json(registration): Json<Registration>,
) -> StatusCode {
    if registration.name.trim().is_empty() || registration.address.trim().is_empty() {
        return StatusCode::UNPROCESSABLE_ENTITY;
    }
    table.register(&registration.name, &registration.address);
    StatusCode::NO_CONTENT
}

async fn deregister(
    State(table): State<Arc<InstanceTable>>,
    Path((name, address)): Path<(String, String)>,
) -> StatusCode {
    if table.deregister(&name, &address) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn resolve(
    State(table): State<Arc<InstanceTable>>,
    Path(name): Path<String>,
) -> Json<Vec<ServiceInstance>> {
    Json(table.resolve(&name))
}

async fn list_services(
    State(table): State<Arc<InstanceTable>>,
) -> Json<BTreeMap<String, Vec<ServiceInstance>>> {
    Json(table.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<InstanceTable>) {
        let table = Arc::new(InstanceTable::new(Duration::from_secs(30)));
        (registry_router(table.clone()), table)
    }

    #[tokio::test]
    async fn test_register_then_resolve() {
        let (app, table) = app();
        let response = app
            .clone()
            .oneshot(
                Request::post("/registry/instances")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"m3","address":"127.0.0.1:9003"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(table.resolve("m3").len(), 1);

        let response = app
            .oneshot(Request::get("/registry/services/m3").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let instances: Vec<ServiceInstance> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(instances, vec![ServiceInstance::new("m3", "127.0.0.1:9003")]);
    }

    #[tokio::test]
    async fn test_deregister_unknown_is_404() {
        let (app, table) = app();
        table.register("m3", "127.0.0.1:9003");

        let response = app
            .clone()
            .oneshot(
                Request::delete("/registry/instances/m3/127.0.0.1:9003")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::delete("/registry/instances/m3/127.0.0.1:9003")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

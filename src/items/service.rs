//! Item lookup composed from two protected remote calls.
//!
//! # Responsibilities
//! - Increment this service's counter on the counter service
//! - Fetch the item from the backing resource
//! - Merge both, substituting fallbacks for whichever call failed
//!
//! # Design Decisions
//! - Neither failure is surfaced to the client; an item request always answers 200
//! - The resource breaker is keyed by the resource authority (host:port)

use axum::http::{header, HeaderValue, Method, StatusCode};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::config::ItemsConfig;
use crate::http::response::epoch_millis;
use crate::registry::RegistryClient;
use crate::resilience::{CallFailure, Endpoint, OutboundRequest, OutboundResponse, ResilientInvoker};

/// Serves `GET /items/{id}` for one item service.
pub struct ItemsService {
    name: String,
    config: ItemsConfig,
    registry: Arc<RegistryClient>,
    invoker: Arc<ResilientInvoker>,
}

impl ItemsService {
    pub fn new(
        name: impl Into<String>,
        config: ItemsConfig,
        registry: Arc<RegistryClient>,
        invoker: Arc<ResilientInvoker>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            registry,
            invoker,
        }
    }

    fn counter_key(&self) -> &str {
        self.config.counter_key.as_deref().unwrap_or(&self.name)
    }

    /// Look up one item. Always produces a JSON object.
    pub async fn get_item(&self, id: &str) -> Value {
        let counter = self.next_counter_value().await;

        let mut item = match self.fetch_resource(id).await {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("item".to_string(), other);
                map
            }
        };
        item.insert("counter".to_string(), counter);
        if let Some(message) = &self.config.message {
            item.insert("message".to_string(), Value::String(message.clone()));
        }
        Value::Object(item)
    }

    async fn next_counter_value(&self) -> Value {
        let key = self.counter_key().to_string();
        let service = &self.config.counter_service;

        let instances = self.registry.resolve(service).await;
        let Some(instance) = instances.first() else {
            tracing::warn!(service = %service, key = %key, "Counter service has no instances");
            return counter_fallback(&key);
        };

        let endpoint = Endpoint::new(service.as_str(), instance.address.as_str());
        let request = OutboundRequest::new(Method::POST, format!("/counters/{key}"))
            .with_header(header::ACCEPT, HeaderValue::from_static("application/json"));
        let response = self
            .invoker
            .invoke(&endpoint, request, |_, _| {
                OutboundResponse::json(StatusCode::OK, &counter_fallback(&key))
            })
            .await;

        response.json_body().unwrap_or_else(|| counter_fallback(&key))
    }

    async fn fetch_resource(&self, id: &str) -> Value {
        let Some(segment) = encode_segment(id) else {
            tracing::warn!(id = %id, "Rejected item id");
            return item_fallback(id, "invalid_item_id");
        };
        let uri = self.config.resource_uri.replace("{id}", &segment);
        let parsed = match url::Url::parse(&uri) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(uri = %uri, error = %e, "Invalid resource URI");
                return item_fallback(&uri, "invalid_resource_uri");
            }
        };
        let Some(host) = parsed.host_str() else {
            return item_fallback(&uri, "invalid_resource_uri");
        };
        let authority = match parsed.port_or_known_default() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        tracing::info!(uri = %uri, "Fetching item");
        let endpoint = Endpoint::new(authority.as_str(), authority.as_str());
        let request = OutboundRequest::new(Method::GET, &parsed[url::Position::BeforePath..])
            .with_header(header::ACCEPT, HeaderValue::from_static("application/json"));
        let response = self
            .invoker
            .invoke(&endpoint, request, |_, failure: CallFailure| {
                OutboundResponse::json(StatusCode::OK, &item_fallback(&uri, failure.reason()))
            })
            .await;

        response
            .json_body()
            .unwrap_or_else(|| Value::String(String::from_utf8_lossy(&response.body).into_owned()))
    }
}

/// Percent-encode `id` as exactly one path segment. Dot segments are
/// refused since the URL parser would resolve them against the template.
fn encode_segment(id: &str) -> Option<String> {
    if matches!(id, "" | "." | "..") {
        return None;
    }
    let mut scratch = url::Url::parse("http://localhost/").ok()?;
    scratch.path_segments_mut().ok()?.clear().push(id);
    Some(scratch.path().trim_start_matches('/').to_string())
}

/// Placeholder counter when the counter service cannot answer.
pub fn counter_fallback(key: &str) -> Value {
    json!({
        "name": key,
        "value": null,
        "message": "fallback",
    })
}

/// Placeholder item when the resource cannot answer.
pub fn item_fallback(requested: &str, reason: &str) -> Value {
    json!({
        "requested_item": requested,
        "message": "fallback",
        "requestedAt": epoch_millis(),
        "reason": reason,
    })
}

//! Gateway request forwarding.
//!
//! # Responsibilities
//! - Match the path against the route table (no match → RouteNotFound)
//! - Resolve the target service (no instances → service-unavailable fallback,
//!   breaker untouched)
//! - Pick one instance and forward through the resilient invoker
//! - Pass the real response through unchanged on success

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Selection;
use crate::error::GatewayError;
use crate::http::request::request_id_of;
use crate::http::response::{service_unavailable, upstream_degraded};
use crate::observability::metrics;
use crate::registry::{RegistryClient, ServiceInstance};
use crate::resilience::{Endpoint, OutboundRequest, ResilientInvoker};
use crate::routing::RouteTable;

/// Forwards inbound requests to logical services.
pub struct GatewayRouter {
    routes: RouteTable,
    registry: Arc<RegistryClient>,
    invoker: Arc<ResilientInvoker>,
    selection: Selection,
    max_body_bytes: usize,
}

impl GatewayRouter {
    pub fn new(
        routes: RouteTable,
        registry: Arc<RegistryClient>,
        invoker: Arc<ResilientInvoker>,
        selection: Selection,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            routes,
            registry,
            invoker,
            selection,
            max_body_bytes,
        }
    }

    pub fn invoker(&self) -> &Arc<ResilientInvoker> {
        &self.invoker
    }

    /// Route one inbound request.
    pub async fn route(&self, request: Request<Body>) -> Result<Response, GatewayError> {
        let start = Instant::now();
        let path = request.uri().path().to_string();
        let method = request.method().clone();
        let request_id = request_id_of(&request).unwrap_or("-").to_string();

        let Some(route) = self.routes.match_path(&path) else {
            tracing::warn!(request_id = %request_id, path = %path, "No route matched");
            metrics::record_request(method.as_str(), 404, "none", start);
            return Err(GatewayError::RouteNotFound(path));
        };
        let service = route.service.to_string();
        let mut forward_path = route.forward_path;
        if let Some(query) = request.uri().query() {
            forward_path.push('?');
            forward_path.push_str(query);
        }

        let instances = self.registry.resolve(&service).await;
        let Some(instance) = self.select(&instances) else {
            tracing::warn!(service = %service, path = %path, "No healthy instances");
            metrics::record_request(method.as_str(), 503, &service, start);
            return Ok(service_unavailable(&service, &path).into_response());
        };
        let endpoint = Endpoint::new(service.as_str(), instance.address.as_str());

        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| GatewayError::Body(e.to_string()))?;

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            endpoint = %endpoint,
            forward_path = %forward_path,
            "Forwarding request"
        );

        let outbound = OutboundRequest {
            method: method.clone(),
            path_and_query: forward_path,
            headers: parts.headers,
            body,
        };
        let response = self
            .invoker
            .invoke(&endpoint, outbound, |_, failure| {
                upstream_degraded(&service, &path, &failure)
            })
            .await;

        metrics::record_request(method.as_str(), response.status.as_u16(), &service, start);
        Ok(response.into_response())
    }

    fn select<'a>(&self, instances: &'a [ServiceInstance]) -> Option<&'a ServiceInstance> {
        match self.selection {
            Selection::First => instances.first(),
            Selection::Random if instances.is_empty() => None,
            Selection::Random => instances.get(fastrand::usize(..instances.len())),
        }
    }
}

//! Outbound transport seam.
//!
//! # Responsibilities
//! - Carry a buffered request to a resolved endpoint and return the buffered response
//! - Strip hop-by-hop headers in both directions, rewrite `host`
//!
//! # Design Decisions
//! - Bodies are buffered (bounded) so a timed-out call leaves nothing half-streamed
//! - `Transport` is a trait so the invoker can be driven by a mock in tests
//! - Deadlines are enforced by the invoker, not here

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::fmt;

use crate::error::TransportError;

/// A resolved call target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Logical service name (the breaker key).
    pub service: String,
    /// Network address (host:port).
    pub address: String,
}

impl Endpoint {
    pub fn new(service: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            address: address.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.service, self.address)
    }
}

/// A buffered outbound request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    /// Path plus optional query, starting with '/'.
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OutboundRequest {
    pub fn new(method: Method, path_and_query: impl Into<String>) -> Self {
        Self {
            method,
            path_and_query: path_and_query.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A buffered response, either real or produced by a fallback.
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OutboundResponse {
    /// A JSON response with the given status.
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body: Bytes::from(value.to_string()),
        }
    }

    /// Body parsed as JSON, if it is JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

impl IntoResponse for OutboundResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Sends one request to one endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, endpoint: &Endpoint, request: OutboundRequest) -> Result<OutboundResponse, TransportError>;
}

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove headers that describe a single connection.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// HTTP/1.1 transport over the hyper legacy client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    max_body_bytes: usize,
}

impl HyperTransport {
    pub fn new(max_body_bytes: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            max_body_bytes,
        }
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, endpoint: &Endpoint, request: OutboundRequest) -> Result<OutboundResponse, TransportError> {
        let uri = format!("http://{}{}", endpoint.address, request.path_and_query);

        let mut builder = Request::builder().method(request.method).uri(&uri);
        if let Some(headers) = builder.headers_mut() {
            *headers = request.headers;
            strip_hop_by_hop(headers);
            headers.remove(header::HOST);
            if let Ok(host) = HeaderValue::from_str(&endpoint.address) {
                headers.insert(header::HOST, host);
            }
        }
        let outbound = builder
            .body(Body::from(request.body))
            .map_err(|e| TransportError::InvalidTarget(format!("{}: {}", uri, e)))?;

        let response: hyper::Response<hyper::body::Incoming> = self
            .client
            .request(outbound)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        Ok(OutboundResponse {
            status: parts.status,
            headers,
            body,
        })
    }
}

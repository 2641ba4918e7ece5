//! HTTP transport abstraction.
//!
//! The gateway only needs "send this request, give me status and body", so the
//! transport is a small trait. `ReqwestTransport` is the real implementation;
//! `MockTransport` (see `mock`) backs tests.

use crate::endpoint::HttpMethod;
use crate::error::{GatewayError, GatewayResult};
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outgoing request, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    pub query: Vec<(String, String)>,
    /// JSON body for POST requests.
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Path component of the URL (without query), used for routing in tests.
    pub fn path(&self) -> &str {
        let without_scheme = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        match without_scheme.find('/') {
            Some(idx) => &without_scheme[idx..],
            None => "/",
        }
    }

    /// Query value by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes HTTP requests.
///
/// Implementations report only transport-level failures as errors; any
/// response the server produced, including non-2xx, is returned as `Ok`.
/// Timeouts and cancellation are enforced by the caller.
pub trait HttpTransport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, GatewayResult<HttpResponse>>;
}

/// `reqwest`-backed transport.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> GatewayResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| GatewayError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shared connection pool).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, GatewayResult<HttpResponse>> {
        Box::pin(async move {
            debug!(url = %request.url, method = ?request.method, "Sending request");

            let builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };
            let builder = if request.query.is_empty() {
                builder
            } else {
                builder.query(&request.query)
            };
            let builder = match &request.body {
                Some(body) => builder.json(body),
                None => builder,
            };

            let response = builder
                .send()
                .await
                .map_err(|e| GatewayError::Network(format!("HTTP request failed: {e}")))?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| GatewayError::Network(format!("Failed to read body: {e}")))?;

            Ok(HttpResponse { status, body })
        })
    }
}

//! In-memory transport for tests.
//!
//! Routes by URL path. Each path can have a handler (called on every request),
//! a queue of one-shot replies (consumed before the handler), and a delay.
//! Unrouted paths answer 404.

use crate::error::{GatewayError, GatewayResult};
use crate::transport::{BoxFuture, HttpRequest, HttpResponse, HttpTransport};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Canned reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 200 with a JSON body.
    Json(Value),
    /// Arbitrary status and body.
    Status(u16, String),
    /// Transport failure (no response).
    NetworkError(String),
}

type Handler = Arc<dyn Fn(&HttpRequest) -> MockReply + Send + Sync>;

/// Mock HTTP transport.
#[derive(Default)]
pub struct MockTransport {
    handlers: Mutex<HashMap<String, Handler>>,
    queued: Mutex<HashMap<String, VecDeque<MockReply>>>,
    delays: Mutex<HashMap<String, Duration>>,
    /// Recorded requests, in arrival order.
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `path` with the same reply.
    pub fn route(&self, path: &str, reply: MockReply) -> &Self {
        self.route_fn(path, move |_| reply.clone())
    }

    /// Answer `path` with a reply computed from the request.
    pub fn route_fn<F>(&self, path: &str, handler: F) -> &Self
    where
        F: Fn(&HttpRequest) -> MockReply + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .insert(path.to_string(), Arc::new(handler));
        self
    }

    /// Queue a one-shot reply for `path`, used before any handler.
    pub fn push_reply(&self, path: &str, reply: MockReply) -> &Self {
        self.queued
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Delay every reply on `path`.
    pub fn delay(&self, path: &str, delay: Duration) -> &Self {
        self.delays.lock().insert(path.to_string(), delay);
        self
    }

    /// Number of requests received for `path`.
    pub fn call_count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path() == path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn reply_for(&self, request: &HttpRequest) -> MockReply {
        let path = request.path();
        if let Some(reply) = self
            .queued
            .lock()
            .get_mut(path)
            .and_then(|queue| queue.pop_front())
        {
            return reply;
        }
        let handler = self.handlers.lock().get(path).cloned();
        match handler {
            Some(handler) => handler(request),
            None => MockReply::Status(404, format!("no route for {path}")),
        }
    }
}

impl HttpTransport for MockTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, GatewayResult<HttpResponse>> {
        Box::pin(async move {
            self.requests.lock().push(request.clone());

            let delay = self.delays.lock().get(request.path()).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            match self.reply_for(&request) {
                MockReply::Json(value) => Ok(HttpResponse {
                    status: 200,
                    body: value.to_string(),
                }),
                MockReply::Status(status, body) => Ok(HttpResponse { status, body }),
                MockReply::NetworkError(msg) => Err(GatewayError::Network(msg)),
            }
        })
    }
}

//! Request gateway.
//!
//! Single entry point for backend calls. For each call:
//! 1. Canonicalize params and form the cache key
//! 2. Serve cacheable endpoints from a live cache entry, if any
//! 3. Otherwise call the transport under a time budget, abortable by a token
//! 4. Cache only successful, decodable responses of cacheable endpoints
//!
//! Identical concurrent calls are not coalesced; the last one to resolve owns
//! the cache slot.

use crate::cache::TtlCache;
use crate::endpoint::{Endpoint, HttpMethod, TimeoutBudgets};
use crate::error::{GatewayError, GatewayResult};
use crate::params::{cache_key, query_pairs};
use crate::transport::{HttpRequest, HttpTransport};
use attn_telemetry::Metrics;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Default cache TTL.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Default cache capacity.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API base URL (e.g., "http://localhost:8000").
    pub base_url: String,
    pub cache_ttl: Duration,
    pub max_entries: usize,
    pub timeouts: TimeoutBudgets,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
            timeouts: TimeoutBudgets::default(),
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Overrides the endpoint's timeout class.
    pub timeout: Option<Duration>,
    /// Aborts the in-flight call when cancelled.
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Typed request gateway with a bounded TTL cache.
pub struct RequestGateway {
    config: GatewayConfig,
    transport: Arc<dyn HttpTransport>,
    cache: Mutex<TtlCache>,
}

impl RequestGateway {
    pub fn new(config: GatewayConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let cache = TtlCache::new(config.cache_ttl, config.max_entries);
        Self {
            config,
            transport,
            cache: Mutex::new(cache),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Issue a typed request.
    pub async fn request<T, P>(
        &self,
        endpoint: Endpoint,
        params: &P,
        options: RequestOptions,
    ) -> GatewayResult<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let params = serde_json::to_value(params)
            .map_err(|e| GatewayError::InvalidRequest(format!("params not serializable: {e}")))?;
        let key = cache_key(endpoint, &params);

        if endpoint.is_cacheable() {
            if let Some(cached) = self.cache_lookup(endpoint, &key) {
                return Ok(cached);
            }
        }

        let budget = options
            .timeout
            .unwrap_or_else(|| self.config.timeouts.for_class(endpoint.timeout_class()));
        let request = self.build_request(endpoint, params)?;

        let started = Instant::now();
        let result = self.execute(endpoint, request, budget, options.cancel).await;
        Metrics::gateway_latency(endpoint.id(), started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok((value, decoded)) => {
                if endpoint.is_cacheable() {
                    self.cache.lock().insert(key, value, Instant::now());
                }
                Metrics::gateway_request(endpoint.id(), "ok");
                Ok(decoded)
            }
            Err(e) => {
                Metrics::gateway_request(endpoint.id(), e.kind());
                match &e {
                    GatewayError::Cancelled => debug!(endpoint = %endpoint, "Request cancelled"),
                    _ => warn!(endpoint = %endpoint, error = %e, "Request failed"),
                }
                Err(e)
            }
        }
    }

    /// Drop all cached entries of one endpoint.
    pub fn invalidate(&self, endpoint: Endpoint) -> usize {
        let removed = self
            .cache
            .lock()
            .remove_prefix(&format!("{}?", endpoint.id()));
        debug!(endpoint = %endpoint, removed, "Cache invalidated");
        removed
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    fn cache_lookup<T: DeserializeOwned>(&self, endpoint: Endpoint, key: &str) -> Option<T> {
        let hit = self.cache.lock().get(key, Instant::now());
        match hit {
            Some(value) => match serde_json::from_value(value) {
                Ok(decoded) => {
                    trace!(endpoint = %endpoint, "Cache hit");
                    Metrics::cache_hit(endpoint.id());
                    Metrics::gateway_request(endpoint.id(), "cached");
                    Some(decoded)
                }
                Err(e) => {
                    // Same key, different target type: go to the network.
                    debug!(endpoint = %endpoint, error = %e, "Cached value does not decode");
                    Metrics::cache_miss(endpoint.id());
                    None
                }
            },
            None => {
                Metrics::cache_miss(endpoint.id());
                None
            }
        }
    }

    fn build_request(&self, endpoint: Endpoint, params: Value) -> GatewayResult<HttpRequest> {
        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.path()
        );
        let request = match endpoint.method() {
            HttpMethod::Get => HttpRequest {
                method: HttpMethod::Get,
                url,
                query: query_pairs(&params)?,
                body: None,
            },
            HttpMethod::Post => HttpRequest {
                method: HttpMethod::Post,
                url,
                query: Vec::new(),
                body: (!params.is_null()).then_some(params),
            },
        };
        Ok(request)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        request: HttpRequest,
        budget: Duration,
        cancel: Option<CancellationToken>,
    ) -> GatewayResult<(Value, T)> {
        debug!(endpoint = %endpoint, url = %request.url, timeout_ms = budget.as_millis() as u64, "Request");

        let call = tokio::time::timeout(budget, self.transport.execute(request));
        let cancelled = async {
            match &cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        let response = tokio::select! {
            biased;
            _ = cancelled => return Err(GatewayError::Cancelled),
            result = call => match result {
                Ok(response) => response?,
                Err(_) => {
                    return Err(GatewayError::Timeout {
                        endpoint: endpoint.id(),
                        timeout_ms: budget.as_millis() as u64,
                    })
                }
            },
        };

        if !response.is_success() {
            return Err(GatewayError::Http {
                status: response.status,
                body: response.body,
            });
        }

        let value: Value = if response.body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&response.body)
                .map_err(|e| GatewayError::Decode(format!("{endpoint}: invalid JSON: {e}")))?
        };
        let decoded = serde_json::from_value(value.clone())
            .map_err(|e| GatewayError::Decode(format!("{endpoint}: {e}")))?;

        Ok((value, decoded))
    }
}

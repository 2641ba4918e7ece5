//! Prometheus metrics for the dashboard data layer.
//!
//! Covers:
//! - Gateway requests and cache effectiveness
//! - Live channel state, reconnects and polling fallback
//! - Preset storage failures
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. Registration only fails on duplicate
//! metric names, which is a programming error caught at first use.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, Encoder, GaugeVec,
    HistogramVec, IntCounterVec, TextEncoder,
};

/// Gateway requests by endpoint and outcome (ok/cached/timeout/http/network/...).
pub static GATEWAY_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "attn_gateway_requests_total",
        "Gateway requests by endpoint and outcome",
        &["endpoint", "outcome"]
    )
    .unwrap()
});

/// Gateway network latency in milliseconds.
pub static GATEWAY_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "attn_gateway_latency_ms",
        "Gateway network latency in milliseconds",
        &["endpoint"],
        vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 10000.0, 60000.0]
    )
    .unwrap()
});

/// Cache lookups by endpoint and result (hit/miss/expired).
pub static CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "attn_cache_lookups_total",
        "Response cache lookups by endpoint and result",
        &["endpoint", "result"]
    )
    .unwrap()
});

/// Live channel state (1 = active state for the kind).
pub static CHANNEL_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "attn_channel_state",
        "Live channel state per kind (1=active, 0=inactive)",
        &["kind", "state"]
    )
    .unwrap()
});

/// Live channel reconnect attempts.
pub static CHANNEL_RECONNECT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "attn_channel_reconnect_total",
        "Live channel reconnect attempts",
        &["kind", "reason"]
    )
    .unwrap()
});

/// Fallback polls issued while a channel was not connected.
pub static POLL_FALLBACK_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "attn_poll_fallback_total",
        "REST polls issued while the push channel was down",
        &["kind", "outcome"]
    )
    .unwrap()
});

/// Preset storage failures swallowed at the store boundary.
pub static PRESET_STORAGE_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "attn_preset_storage_errors_total",
        "Preset storage errors degraded to no-data",
        &["operation"]
    )
    .unwrap()
});

const CHANNEL_STATES: [&str; 5] = [
    "connecting",
    "connected",
    "disconnected",
    "error",
    "unavailable",
];

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a finished gateway request.
    pub fn gateway_request(endpoint: &str, outcome: &str) {
        GATEWAY_REQUESTS_TOTAL
            .with_label_values(&[endpoint, outcome])
            .inc();
    }

    /// Record network latency of a gateway request.
    pub fn gateway_latency(endpoint: &str, latency_ms: f64) {
        GATEWAY_LATENCY_MS
            .with_label_values(&[endpoint])
            .observe(latency_ms);
    }

    pub fn cache_hit(endpoint: &str) {
        CACHE_LOOKUPS_TOTAL
            .with_label_values(&[endpoint, "hit"])
            .inc();
    }

    pub fn cache_miss(endpoint: &str) {
        CACHE_LOOKUPS_TOTAL
            .with_label_values(&[endpoint, "miss"])
            .inc();
    }

    /// Set the active state of a channel kind; all other states go to 0.
    pub fn channel_state_set(kind: &str, state: &str) {
        for s in CHANNEL_STATES {
            CHANNEL_STATE.with_label_values(&[kind, s]).set(0.0);
        }
        CHANNEL_STATE.with_label_values(&[kind, state]).set(1.0);
    }

    pub fn channel_reconnect(kind: &str, reason: &str) {
        CHANNEL_RECONNECT_TOTAL
            .with_label_values(&[kind, reason])
            .inc();
    }

    pub fn poll_fallback(kind: &str, outcome: &str) {
        POLL_FALLBACK_TOTAL
            .with_label_values(&[kind, outcome])
            .inc();
    }

    pub fn preset_storage_error(operation: &str) {
        PRESET_STORAGE_ERRORS_TOTAL
            .with_label_values(&[operation])
            .inc();
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_state_single_active() {
        Metrics::channel_state_set("price", "connecting");
        Metrics::channel_state_set("price", "connected");

        let active: f64 = CHANNEL_STATES
            .iter()
            .map(|s| CHANNEL_STATE.with_label_values(&["price", s]).get())
            .sum();
        assert_eq!(active, 1.0);
        assert_eq!(
            CHANNEL_STATE
                .with_label_values(&["price", "connected"])
                .get(),
            1.0
        );
    }

    #[test]
    fn test_gather_text_contains_counters() {
        Metrics::gateway_request("symbols", "ok");
        let text = Metrics::gather_text().unwrap();
        assert!(text.contains("attn_gateway_requests_total"));
    }
}

//! Progressive view loading.
//!
//! A view is loaded in three waves:
//! 1. Critical: price window + summary stats, in parallel. Price is mandatory;
//!    a failed summary resolves to `None`.
//! 2. Secondary: attention series, latest news, attention events, in parallel.
//!    Each source falls back to empty on failure.
//! 3. Background: long daily overview; empty on failure.
//!
//! Waves 2 and 3 start only after wave 1 succeeds and then run independently.
//! If wave 1 fails they are never issued.

use crate::config::LoaderConfig;
use crate::error::{LoaderError, LoaderResult};
use crate::handle::WaveHandle;
use attn_core::{AttentionEvent, AttentionPoint, Candle, NewsItem, SummaryStats, Timeframe};
use attn_gateway::{DashboardApi, EventsQuery, GatewayError, GatewayResult, NewsQuery, SeriesQuery};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Wave 1 result.
#[derive(Debug, Clone, PartialEq)]
pub struct CriticalData {
    pub candles: Vec<Candle>,
    pub summary: Option<SummaryStats>,
}

/// Wave 2 result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecondaryData {
    pub attention: Vec<AttentionPoint>,
    pub news: Vec<NewsItem>,
    pub events: Vec<AttentionEvent>,
}

/// Wave 3 result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackgroundData {
    pub overview: Vec<Candle>,
}

/// In-flight view load.
#[derive(Debug)]
pub struct ViewLoad {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub critical: WaveHandle<CriticalData>,
    pub secondary: WaveHandle<SecondaryData>,
    pub background: WaveHandle<BackgroundData>,
}

/// Orchestrates the three loading waves of a dashboard view.
#[derive(Clone)]
pub struct ProgressiveLoader {
    api: DashboardApi,
    config: LoaderConfig,
}

impl ProgressiveLoader {
    pub fn new(api: DashboardApi, config: LoaderConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Start loading a view. Must be called inside a tokio runtime.
    ///
    /// Cancelling `cancel` aborts in-flight calls; unresolved handles then
    /// resolve to `LoaderError::Cancelled`.
    pub fn load_view(
        &self,
        symbol: impl Into<String>,
        timeframe: Timeframe,
        cancel: CancellationToken,
    ) -> ViewLoad {
        let symbol = symbol.into();
        let (critical_tx, critical) = WaveHandle::channel();
        let (secondary_tx, secondary) = WaveHandle::channel();
        let (background_tx, background) = WaveHandle::channel();

        let run = ViewRun {
            api: self.api.with_cancel(cancel.clone()),
            config: self.config.clone(),
            symbol: symbol.clone(),
            timeframe,
            cancel,
        };
        tokio::spawn(run.execute(critical_tx, secondary_tx, background_tx));

        ViewLoad {
            symbol,
            timeframe,
            critical,
            secondary,
            background,
        }
    }
}

/// One view load; owned by its task.
#[derive(Clone)]
struct ViewRun {
    api: DashboardApi,
    config: LoaderConfig,
    symbol: String,
    timeframe: Timeframe,
    cancel: CancellationToken,
}

impl ViewRun {
    async fn execute(
        self,
        critical_tx: oneshot::Sender<LoaderResult<CriticalData>>,
        secondary_tx: oneshot::Sender<LoaderResult<SecondaryData>>,
        background_tx: oneshot::Sender<LoaderResult<BackgroundData>>,
    ) {
        info!(symbol = %self.symbol, timeframe = %self.timeframe, "Loading view");

        match self.critical_wave().await {
            Ok(data) => {
                debug!(symbol = %self.symbol, candles = data.candles.len(), "Critical wave done");
                // Receivers may have been dropped; that only means nobody waits.
                let _ = critical_tx.send(Ok(data));
            }
            Err(e) => {
                let cancelled = e.is_cancelled();
                if !cancelled {
                    warn!(symbol = %self.symbol, error = %e, "Critical wave failed");
                }
                let skipped = || {
                    if cancelled {
                        LoaderError::Cancelled
                    } else {
                        LoaderError::CriticalFailed
                    }
                };
                let _ = critical_tx.send(Err(e));
                let _ = secondary_tx.send(Err(skipped()));
                let _ = background_tx.send(Err(skipped()));
                return;
            }
        }

        let secondary = self.clone();
        let secondary_task = tokio::spawn(async move {
            let result = secondary.secondary_wave().await;
            let _ = secondary_tx.send(result);
        });

        let result = self.background_wave().await;
        let _ = background_tx.send(result);

        // The secondary task reports on its own; a join error only means it
        // was aborted, and its handle then resolves to Cancelled.
        let _ = secondary_task.await;
    }

    async fn critical_wave(&self) -> LoaderResult<CriticalData> {
        let price_query =
            SeriesQuery::new(&self.symbol, self.timeframe).limit(self.config.price_window);
        let (candles, summary) = tokio::join!(
            self.api.price_series(&price_query),
            self.api.summary_stats(&self.symbol),
        );

        if self.cancel.is_cancelled() {
            return Err(LoaderError::Cancelled);
        }

        let candles = candles.map_err(|e| match e {
            GatewayError::Cancelled => LoaderError::Cancelled,
            other => LoaderError::Critical(other),
        })?;
        let summary = self.optional("summary_stats", summary);

        Ok(CriticalData { candles, summary })
    }

    async fn secondary_wave(&self) -> LoaderResult<SecondaryData> {
        let attention_query =
            SeriesQuery::new(&self.symbol, self.timeframe).limit(self.config.attention_window);
        let news_query = NewsQuery {
            symbol: Some(self.symbol.clone()),
            limit: Some(self.config.news_limit),
            ..NewsQuery::default()
        };
        let events_query = EventsQuery {
            symbol: self.symbol.clone(),
            limit: Some(self.config.events_limit),
            min_intensity: None,
        };

        let (attention, news, events) = tokio::join!(
            self.api.attention_series(&attention_query),
            self.api.news(&news_query),
            self.api.attention_events(&events_query),
        );

        if self.cancel.is_cancelled() {
            return Err(LoaderError::Cancelled);
        }

        Ok(SecondaryData {
            attention: self.optional("attention_series", attention).unwrap_or_default(),
            news: self.optional("news", news).unwrap_or_default(),
            events: self.optional("attention_events", events).unwrap_or_default(),
        })
    }

    async fn background_wave(&self) -> LoaderResult<BackgroundData> {
        let overview_query =
            SeriesQuery::new(&self.symbol, Timeframe::Day1).limit(self.config.overview_days);
        let overview = self.api.price_series(&overview_query).await;

        if self.cancel.is_cancelled() {
            return Err(LoaderError::Cancelled);
        }

        Ok(BackgroundData {
            overview: self.optional("overview", overview).unwrap_or_default(),
        })
    }

    /// Isolate a non-mandatory source: log the failure, yield `None`.
    fn optional<T>(&self, source: &'static str, result: GatewayResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(symbol = %self.symbol, source, error = %e, "Optional source failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attn_gateway::{GatewayConfig, MockReply, MockTransport, RequestGateway};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    fn candles(n: usize) -> Value {
        Value::Array(
            (0..n)
                .map(|i| {
                    json!({
                        "timestamp": i as i64 * 3_600_000,
                        "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0, "volume": 1.0
                    })
                })
                .collect(),
        )
    }

    fn routed_mock() -> Arc<MockTransport> {
        let mock = Arc::new(MockTransport::new());
        mock.route_fn("/api/price", |req| {
            if req.query_param("timeframe") == Some("1d") {
                MockReply::Json(candles(365))
            } else {
                MockReply::Json(candles(300))
            }
        });
        mock.route(
            "/api/summary",
            MockReply::Json(json!({"symbol": "ZEC", "last_price": 35.2})),
        );
        mock.route(
            "/api/attention",
            MockReply::Json(json!([{"timestamp": 1, "attention_score": 0.4}])),
        );
        mock.route(
            "/api/news",
            MockReply::Json(json!([{
                "title": "ZEC rallies", "source": "wire", "url": "https://example.com/a",
                "published_at": "2024-05-01T00:00:00Z"
            }])),
        );
        mock.route(
            "/api/attention-events",
            MockReply::Json(json!([{"timestamp": 1, "event_type": "spike"}])),
        );
        mock
    }

    fn loader(mock: Arc<MockTransport>) -> ProgressiveLoader {
        let gateway = RequestGateway::new(GatewayConfig::new("http://mock"), mock);
        ProgressiveLoader::new(
            DashboardApi::new(Arc::new(gateway)),
            LoaderConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_all_waves_succeed() {
        let mock = routed_mock();
        let view = loader(mock.clone()).load_view("ZEC", Timeframe::Hour1, CancellationToken::new());

        let critical = view.critical.await.unwrap();
        assert_eq!(critical.candles.len(), 300);
        assert_eq!(critical.summary.unwrap().last_price, Some(35.2));

        let secondary = view.secondary.await.unwrap();
        assert_eq!(secondary.attention.len(), 1);
        assert_eq!(secondary.news.len(), 1);
        assert_eq!(secondary.events.len(), 1);

        let background = view.background.await.unwrap();
        assert_eq!(background.overview.len(), 365);

        let price_requests: Vec<_> = mock
            .requests()
            .into_iter()
            .filter(|r| r.path() == "/api/price")
            .collect();
        assert_eq!(price_requests[0].query_param("limit"), Some("500"));
    }

    #[tokio::test]
    async fn test_summary_failure_keeps_candles() {
        let mock = routed_mock();
        mock.route("/api/summary", MockReply::Status(500, "boom".into()));

        let view = loader(mock).load_view("ZEC", Timeframe::Hour1, CancellationToken::new());

        let critical = view.critical.await.unwrap();
        assert_eq!(critical.candles.len(), 300);
        assert!(critical.summary.is_none());
    }

    #[tokio::test]
    async fn test_news_failure_isolated() {
        let mock = routed_mock();
        mock.route("/api/news", MockReply::NetworkError("reset".into()));

        let view = loader(mock).load_view("ZEC", Timeframe::Hour1, CancellationToken::new());

        view.critical.await.unwrap();
        let secondary = view.secondary.await.unwrap();
        assert!(secondary.news.is_empty());
        assert_eq!(secondary.attention.len(), 1);
        assert_eq!(secondary.events.len(), 1);
    }

    #[tokio::test]
    async fn test_background_failure_yields_empty() {
        let mock = routed_mock();
        mock.route_fn("/api/price", |req| {
            if req.query_param("timeframe") == Some("1d") {
                MockReply::Status(503, "unavailable".into())
            } else {
                MockReply::Json(candles(10))
            }
        });

        let view = loader(mock).load_view("ZEC", Timeframe::Hour1, CancellationToken::new());
        assert!(view.background.await.unwrap().overview.is_empty());
        assert_eq!(view.secondary.await.unwrap().attention.len(), 1);
    }

    #[tokio::test]
    async fn test_critical_failure_skips_later_waves() {
        let mock = routed_mock();
        mock.route("/api/price", MockReply::Status(502, "bad gateway".into()));

        let view = loader(mock.clone()).load_view("ZEC", Timeframe::Hour1, CancellationToken::new());

        match view.critical.await {
            Err(LoaderError::Critical(GatewayError::Http { status: 502, .. })) => {}
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            view.secondary.await,
            Err(LoaderError::CriticalFailed)
        ));
        assert!(matches!(
            view.background.await,
            Err(LoaderError::CriticalFailed)
        ));
        assert_eq!(mock.call_count("/api/attention"), 0);
        assert_eq!(mock.call_count("/api/news"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_secondary_starts_after_critical() {
        let mock = routed_mock();
        mock.delay("/api/summary", Duration::from_secs(2));

        let mut view = loader(mock.clone()).load_view("ZEC", Timeframe::Hour1, CancellationToken::new());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(view.critical.try_take().is_none());
        assert_eq!(mock.call_count("/api/attention"), 0);

        let critical = view.critical.await.unwrap();
        assert!(critical.summary.is_some());
        view.secondary.await.unwrap();
        assert_eq!(mock.call_count("/api/attention"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_resolves_all_handles() {
        let mock = routed_mock();
        mock.delay("/api/price", Duration::from_secs(10));

        let cancel = CancellationToken::new();
        let view = loader(mock.clone()).load_view("ZEC", Timeframe::Hour1, cancel.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        assert!(view.critical.await.unwrap_err().is_cancelled());
        assert!(view.secondary.await.unwrap_err().is_cancelled());
        assert!(view.background.await.unwrap_err().is_cancelled());
        assert_eq!(mock.call_count("/api/news"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_secondary() {
        let mock = routed_mock();
        mock.delay("/api/news", Duration::from_secs(10));
        mock.delay("/api/price", Duration::from_millis(10));

        let cancel = CancellationToken::new();
        let view = loader(mock).load_view("ZEC", Timeframe::Hour1, cancel.clone());

        view.critical.await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        assert!(view.secondary.await.unwrap_err().is_cancelled());
    }
}

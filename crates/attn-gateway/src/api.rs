//! Typed facade over the gateway, one method per backend endpoint.

use crate::endpoint::Endpoint;
use crate::error::GatewayResult;
use crate::gateway::{RequestGateway, RequestOptions};
use attn_core::{
    AttentionEvent, AttentionPoint, AttentionTick, BacktestParams, BacktestResult,
    BacktestSummary, Candle, MultiBacktestParams, NewsCount, NewsItem, NewsTrendPoint, PriceTick,
    SummaryStats, Timeframe,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Time-series query (price and attention).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesQuery {
    pub symbol: String,
    pub timeframe: Timeframe,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Start, epoch millis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

impl SeriesQuery {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            limit: None,
            start: None,
            end: None,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn range(mut self, start: i64, end: i64) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}

/// News list query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventsQuery {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Minimum intensity to report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_intensity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPerformanceQuery {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizon_days: Option<u32>,
}

/// Scenario / regime analysis request.
///
/// Analysis inputs vary by panel; anything beyond symbol and lookback is
/// passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub symbol: String,
    pub lookback_days: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisRequest {
    pub fn new(symbol: impl Into<String>, lookback_days: u32) -> Self {
        Self {
            symbol: symbol.into(),
            lookback_days,
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

/// Multi-symbol backtest response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiBacktestResponse {
    /// Result per symbol.
    pub results: BTreeMap<String, BacktestResult>,
    #[serde(default)]
    pub aggregate: Option<BacktestSummary>,
}

/// Backend auto-update scheduler state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoUpdateStatus {
    pub enabled: bool,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub interval_minutes: Option<u32>,
    #[serde(default)]
    pub symbols: Vec<String>,
}

#[derive(Serialize)]
struct SymbolParam<'a> {
    symbol: &'a str,
}

#[derive(Serialize)]
struct TrendParams<'a> {
    symbol: &'a str,
    timeframe: Timeframe,
}

/// Typed backend API.
///
/// Cheap to clone. `with_cancel` / `with_timeout` return a copy whose calls
/// carry those options.
#[derive(Clone)]
pub struct DashboardApi {
    gateway: Arc<RequestGateway>,
    options: RequestOptions,
}

impl DashboardApi {
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        Self {
            gateway,
            options: RequestOptions::default(),
        }
    }

    pub fn gateway(&self) -> &Arc<RequestGateway> {
        &self.gateway
    }

    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            gateway: self.gateway.clone(),
            options: self.options.clone().with_cancel(cancel),
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            gateway: self.gateway.clone(),
            options: self.options.clone().with_timeout(timeout),
        }
    }

    async fn call<T, P>(&self, endpoint: Endpoint, params: &P) -> GatewayResult<T>
    where
        T: serde::de::DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.gateway
            .request(endpoint, params, self.options.clone())
            .await
    }

    pub async fn symbols(&self) -> GatewayResult<Vec<String>> {
        self.call(Endpoint::Symbols, &Value::Null).await
    }

    pub async fn summary_stats(&self, symbol: &str) -> GatewayResult<SummaryStats> {
        self.call(Endpoint::SummaryStats, &SymbolParam { symbol })
            .await
    }

    pub async fn price_series(&self, query: &SeriesQuery) -> GatewayResult<Vec<Candle>> {
        self.call(Endpoint::PriceSeries, query).await
    }

    pub async fn attention_series(
        &self,
        query: &SeriesQuery,
    ) -> GatewayResult<Vec<AttentionPoint>> {
        self.call(Endpoint::AttentionSeries, query).await
    }

    pub async fn attention_events(
        &self,
        query: &EventsQuery,
    ) -> GatewayResult<Vec<AttentionEvent>> {
        self.call(Endpoint::AttentionEvents, query).await
    }

    pub async fn news(&self, query: &NewsQuery) -> GatewayResult<Vec<NewsItem>> {
        self.call(Endpoint::News, query).await
    }

    pub async fn news_count(&self, symbol: &str) -> GatewayResult<NewsCount> {
        self.call(Endpoint::NewsCount, &SymbolParam { symbol }).await
    }

    pub async fn news_trend(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> GatewayResult<Vec<NewsTrendPoint>> {
        self.call(Endpoint::NewsTrend, &TrendParams { symbol, timeframe })
            .await
    }

    pub async fn scenario_analysis(&self, request: &AnalysisRequest) -> GatewayResult<Value> {
        self.call(Endpoint::ScenarioAnalysis, request).await
    }

    pub async fn regime_analysis(&self, request: &AnalysisRequest) -> GatewayResult<Value> {
        self.call(Endpoint::RegimeAnalysis, request).await
    }

    pub async fn backtest(&self, params: &BacktestParams) -> GatewayResult<BacktestResult> {
        self.call(Endpoint::Backtest, params).await
    }

    pub async fn multi_backtest(
        &self,
        params: &MultiBacktestParams,
    ) -> GatewayResult<MultiBacktestResponse> {
        self.call(Endpoint::MultiBacktest, params).await
    }

    pub async fn event_performance(&self, query: &EventPerformanceQuery) -> GatewayResult<Value> {
        self.call(Endpoint::EventPerformance, query).await
    }

    pub async fn auto_update_status(&self) -> GatewayResult<AutoUpdateStatus> {
        self.call(Endpoint::AutoUpdateStatus, &Value::Null).await
    }

    pub async fn auto_update_enable(&self) -> GatewayResult<AutoUpdateStatus> {
        self.call(Endpoint::AutoUpdateEnable, &Value::Null).await
    }

    pub async fn auto_update_disable(&self) -> GatewayResult<AutoUpdateStatus> {
        self.call(Endpoint::AutoUpdateDisable, &Value::Null).await
    }

    pub async fn auto_update_trigger(&self) -> GatewayResult<Value> {
        self.call(Endpoint::AutoUpdateTrigger, &Value::Null).await
    }

    /// Most recent close as a tick; `None` if the series is empty.
    pub async fn latest_price(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> GatewayResult<Option<PriceTick>> {
        let candles = self
            .price_series(&SeriesQuery::new(symbol, timeframe).limit(1))
            .await?;
        Ok(candles.last().map(|c| PriceTick {
            symbol: symbol.to_string(),
            price: c.close,
            timestamp: c.timestamp,
        }))
    }

    /// Most recent attention score as a tick; `None` if the series is empty.
    pub async fn latest_attention(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> GatewayResult<Option<AttentionTick>> {
        let points = self
            .attention_series(&SeriesQuery::new(symbol, timeframe).limit(1))
            .await?;
        Ok(points.last().map(|p| AttentionTick {
            symbol: symbol.to_string(),
            attention_score: p.attention_score,
            timestamp: p.timestamp,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayConfig;
    use crate::mock::{MockReply, MockTransport};
    use serde_json::json;

    fn api_with(mock: Arc<MockTransport>) -> DashboardApi {
        let gateway = RequestGateway::new(GatewayConfig::new("http://mock/"), mock);
        DashboardApi::new(Arc::new(gateway))
    }

    #[tokio::test]
    async fn test_price_series_query_encoding() {
        let mock = Arc::new(MockTransport::new());
        mock.route(
            "/api/price",
            MockReply::Json(json!([
                {"timestamp": 1000, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 10.0}
            ])),
        );
        let api = api_with(mock.clone());

        let candles = api
            .price_series(&SeriesQuery::new("ZEC", Timeframe::Hour1).limit(300))
            .await
            .unwrap();

        assert_eq!(candles.len(), 1);
        let req = &mock.requests()[0];
        assert_eq!(req.url, "http://mock/api/price");
        assert_eq!(req.query_param("symbol"), Some("ZEC"));
        assert_eq!(req.query_param("timeframe"), Some("1h"));
        assert_eq!(req.query_param("limit"), Some("300"));
        assert_eq!(req.query_param("start"), None);
    }

    #[tokio::test]
    async fn test_latest_price_uses_last_candle() {
        let mock = Arc::new(MockTransport::new());
        mock.route(
            "/api/price",
            MockReply::Json(json!([
                {"timestamp": 1, "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0},
                {"timestamp": 2, "open": 1.0, "high": 3.0, "low": 1.0, "close": 2.5}
            ])),
        );
        let api = api_with(mock);

        let tick = api
            .latest_price("BTC", Timeframe::Min1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tick.price, 2.5);
        assert_eq!(tick.timestamp, 2);
    }

    #[tokio::test]
    async fn test_latest_attention_empty() {
        let mock = Arc::new(MockTransport::new());
        mock.route("/api/attention", MockReply::Json(json!([])));
        let api = api_with(mock);

        assert!(api
            .latest_attention("BTC", Timeframe::Min1)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_backtest_posts_params() {
        let mock = Arc::new(MockTransport::new());
        mock.route(
            "/api/backtest",
            MockReply::Json(json!({
                "summary": {
                    "total_trades": 12, "win_rate": 0.5, "avg_return": 0.01,
                    "cumulative_return": 0.12, "max_drawdown": -0.08
                },
                "equity_curve": [{"datetime": "2024-01-01T00:00:00Z", "equity": 1.0}]
            })),
        );
        let api = api_with(mock.clone());

        let result = api.backtest(&BacktestParams::default()).await.unwrap();
        assert_eq!(result.summary.total_trades, 12);
        assert_eq!(result.equity_curve.len(), 1);

        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["symbol"], "BTC");
    }

    #[tokio::test]
    async fn test_analysis_request_flattens_extra() {
        let mock = Arc::new(MockTransport::new());
        mock.route("/api/regimes", MockReply::Json(json!({"regimes": []})));
        let api = api_with(mock.clone());

        let request = AnalysisRequest::new("ETH", 90).with("quantiles", json!([0.2, 0.8]));
        api.regime_analysis(&request).await.unwrap();

        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["lookback_days"], 90);
        assert_eq!(body["quantiles"], json!([0.2, 0.8]));
    }

    #[tokio::test]
    async fn test_auto_update_status() {
        let mock = Arc::new(MockTransport::new());
        mock.route(
            "/api/auto-update/status",
            MockReply::Json(json!({"enabled": true, "interval_minutes": 15})),
        );
        let api = api_with(mock);

        let status = api.auto_update_status().await.unwrap();
        assert!(status.enabled);
        assert_eq!(status.interval_minutes, Some(15));
        assert!(status.last_run.is_none());
    }
}

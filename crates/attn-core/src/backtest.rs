//! Backtest parameter and result types.
//!
//! These are the payloads a preset persists: the parameters the user saved
//! and the summary/equity curve of the last run under that name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parameters of the attention-driven strategy backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestParams {
    pub symbol: String,
    /// Rolling window used to rank attention (days).
    pub lookback_days: u32,
    /// Attention quantile that triggers an entry (0.0-1.0).
    pub attention_quantile: f64,
    /// Entries are skipped when the day's return already exceeds this.
    pub max_daily_return: f64,
    pub holding_days: u32,
    #[serde(default)]
    pub stop_loss_pct: Option<f64>,
    #[serde(default)]
    pub take_profit_pct: Option<f64>,
    /// Fraction of equity per trade (0.0-1.0).
    #[serde(default = "default_position_size")]
    pub position_size: f64,
}

fn default_position_size() -> f64 {
    1.0
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            symbol: "BTC".to_string(),
            lookback_days: 30,
            attention_quantile: 0.8,
            max_daily_return: 0.05,
            holding_days: 3,
            stop_loss_pct: None,
            take_profit_pct: None,
            position_size: default_position_size(),
        }
    }
}

/// Same strategy run across several symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiBacktestParams {
    pub symbols: Vec<String>,
    #[serde(flatten)]
    pub params: BacktestParams,
}

/// Optional attention regime filter applied on top of the params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionCondition {
    /// Attention source ("composite", "news", "social").
    pub source: String,
    /// Required regime ("high", "rising", ...).
    pub regime: String,
    pub lookback_days: u32,
}

/// Headline statistics of a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub total_trades: u32,
    pub win_rate: f64,
    pub avg_return: f64,
    pub cumulative_return: f64,
    pub max_drawdown: f64,
    #[serde(default)]
    pub sharpe: Option<f64>,
}

/// One point of the equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub datetime: DateTime<Utc>,
    pub equity: f64,
}

/// Full backtest response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub summary: BacktestSummary,
    #[serde(default)]
    pub equity_curve: Vec<EquityPoint>,
}

//! Price and attention series types.
//!
//! Field names follow the backend's snake_case JSON. Optional fields carry
//! `#[serde(default)]` so older backend builds that omit them still decode.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chart timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Min1,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
}

impl Timeframe {
    /// Duration of one bar in milliseconds.
    pub fn millis(&self) -> i64 {
        match self {
            Self::Min1 => 60_000,
            Self::Min5 => 5 * 60_000,
            Self::Min15 => 15 * 60_000,
            Self::Hour1 => 60 * 60_000,
            Self::Hour4 => 4 * 60 * 60_000,
            Self::Day1 => 24 * 60 * 60_000,
        }
    }

    /// Short label used on the wire ("1h", "1d", ...).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Min1 => "1m",
            Self::Min5 => "5m",
            Self::Min15 => "15m",
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Day1 => "1d",
        }
    }

    /// All timeframes, shortest first.
    pub fn all() -> &'static [Timeframe] {
        &[
            Self::Min1,
            Self::Min5,
            Self::Min15,
            Self::Hour1,
            Self::Hour4,
            Self::Day1,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|tf| tf.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::InvalidTimeframe(s.to_string()))
    }
}

/// Normalize a user-entered symbol ("zec " -> "ZEC").
pub fn normalize_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim().to_ascii_uppercase();
    if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CoreError::InvalidSymbol(raw.to_string()));
    }
    Ok(symbol)
}

/// OHLCV candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time (ms since epoch).
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// One point of the attention score series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionPoint {
    pub timestamp: i64,
    pub attention_score: f64,
    #[serde(default)]
    pub news_count: u32,
}

/// A detected attention spike or regime change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionEvent {
    pub timestamp: i64,
    pub event_type: String,
    #[serde(default)]
    pub intensity: f64,
    #[serde(default)]
    pub summary: String,
}

/// A news headline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub source: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub sentiment: Option<f64>,
}

/// News volume for a symbol over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsCount {
    pub symbol: String,
    pub count: u64,
}

/// Bucketed news volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsTrendPoint {
    pub timestamp: i64,
    pub count: u64,
}

/// Headline numbers shown above the main chart.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    pub symbol: String,
    #[serde(default)]
    pub last_price: Option<f64>,
    #[serde(default)]
    pub change_24h_pct: Option<f64>,
    #[serde(default)]
    pub volume_24h: Option<f64>,
    #[serde(default)]
    pub attention_score: Option<f64>,
    #[serde(default)]
    pub news_count_24h: Option<u64>,
}

//! Loader window sizes.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoaderConfig {
    /// Candles in the critical price window.
    #[serde(default = "default_price_window")]
    pub price_window: u32,
    /// Attention points loaded with the secondary wave.
    #[serde(default = "default_price_window")]
    pub attention_window: u32,
    #[serde(default = "default_news_limit")]
    pub news_limit: u32,
    #[serde(default = "default_events_limit")]
    pub events_limit: u32,
    /// Daily candles in the background overview.
    #[serde(default = "default_overview_days")]
    pub overview_days: u32,
}

fn default_price_window() -> u32 {
    500
}

fn default_news_limit() -> u32 {
    20
}

fn default_events_limit() -> u32 {
    50
}

fn default_overview_days() -> u32 {
    365
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            price_window: default_price_window(),
            attention_window: default_price_window(),
            news_limit: default_news_limit(),
            events_limit: default_events_limit(),
            overview_days: default_overview_days(),
        }
    }
}

//! Endpoint catalogue and cache policy.
//!
//! Every backend call goes through one of these variants. The policy table is
//! static: series and analytical endpoints are volatile (never cached), only
//! low-variance metadata is cacheable, and anything sent with POST is volatile.

use std::fmt;
use std::time::Duration;

/// HTTP method of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Whether responses may be served from the TTL cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Cacheable,
    Volatile,
}

/// Request time budget class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    /// Simple lookups and summaries.
    Short,
    Standard,
    /// Heavy analytical computations (backtests, scenarios).
    Long,
}

/// Per-class time budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutBudgets {
    pub short: Duration,
    pub standard: Duration,
    pub long: Duration,
}

impl TimeoutBudgets {
    pub fn for_class(&self, class: TimeoutClass) -> Duration {
        match class {
            TimeoutClass::Short => self.short,
            TimeoutClass::Standard => self.standard,
            TimeoutClass::Long => self.long,
        }
    }
}

impl Default for TimeoutBudgets {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(10),
            standard: Duration::from_secs(30),
            long: Duration::from_secs(120),
        }
    }
}

/// Logical backend endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Symbols,
    SummaryStats,
    PriceSeries,
    AttentionSeries,
    AttentionEvents,
    News,
    NewsCount,
    NewsTrend,
    ScenarioAnalysis,
    RegimeAnalysis,
    Backtest,
    MultiBacktest,
    EventPerformance,
    AutoUpdateStatus,
    AutoUpdateEnable,
    AutoUpdateDisable,
    AutoUpdateTrigger,
}

impl Endpoint {
    /// Stable identifier used in cache keys, logs and metrics.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Symbols => "symbols",
            Self::SummaryStats => "summary_stats",
            Self::PriceSeries => "price_series",
            Self::AttentionSeries => "attention_series",
            Self::AttentionEvents => "attention_events",
            Self::News => "news",
            Self::NewsCount => "news_count",
            Self::NewsTrend => "news_trend",
            Self::ScenarioAnalysis => "scenario_analysis",
            Self::RegimeAnalysis => "regime_analysis",
            Self::Backtest => "backtest",
            Self::MultiBacktest => "multi_backtest",
            Self::EventPerformance => "event_performance",
            Self::AutoUpdateStatus => "auto_update_status",
            Self::AutoUpdateEnable => "auto_update_enable",
            Self::AutoUpdateDisable => "auto_update_disable",
            Self::AutoUpdateTrigger => "auto_update_trigger",
        }
    }

    /// Path relative to the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Symbols => "/api/symbols",
            Self::SummaryStats => "/api/summary",
            Self::PriceSeries => "/api/price",
            Self::AttentionSeries => "/api/attention",
            Self::AttentionEvents => "/api/attention-events",
            Self::News => "/api/news",
            Self::NewsCount => "/api/news/count",
            Self::NewsTrend => "/api/news/trend",
            Self::ScenarioAnalysis => "/api/scenarios",
            Self::RegimeAnalysis => "/api/regimes",
            Self::Backtest => "/api/backtest",
            Self::MultiBacktest => "/api/backtest/multi",
            Self::EventPerformance => "/api/event-performance",
            Self::AutoUpdateStatus => "/api/auto-update/status",
            Self::AutoUpdateEnable => "/api/auto-update/enable",
            Self::AutoUpdateDisable => "/api/auto-update/disable",
            Self::AutoUpdateTrigger => "/api/auto-update/trigger",
        }
    }

    pub fn method(&self) -> HttpMethod {
        match self {
            Self::ScenarioAnalysis
            | Self::RegimeAnalysis
            | Self::Backtest
            | Self::MultiBacktest
            | Self::AutoUpdateEnable
            | Self::AutoUpdateDisable
            | Self::AutoUpdateTrigger => HttpMethod::Post,
            _ => HttpMethod::Get,
        }
    }

    pub fn policy(&self) -> CachePolicy {
        if self.method() == HttpMethod::Post {
            return CachePolicy::Volatile;
        }
        match self {
            Self::Symbols | Self::SummaryStats => CachePolicy::Cacheable,
            _ => CachePolicy::Volatile,
        }
    }

    pub fn timeout_class(&self) -> TimeoutClass {
        match self {
            Self::Symbols
            | Self::SummaryStats
            | Self::NewsCount
            | Self::AutoUpdateStatus
            | Self::AutoUpdateEnable
            | Self::AutoUpdateDisable => TimeoutClass::Short,
            Self::ScenarioAnalysis
            | Self::RegimeAnalysis
            | Self::Backtest
            | Self::MultiBacktest
            | Self::EventPerformance => TimeoutClass::Long,
            _ => TimeoutClass::Standard,
        }
    }

    pub fn is_cacheable(&self) -> bool {
        self.policy() == CachePolicy::Cacheable
    }

    pub fn all() -> &'static [Endpoint] {
        &[
            Self::Symbols,
            Self::SummaryStats,
            Self::PriceSeries,
            Self::AttentionSeries,
            Self::AttentionEvents,
            Self::News,
            Self::NewsCount,
            Self::NewsTrend,
            Self::ScenarioAnalysis,
            Self::RegimeAnalysis,
            Self::Backtest,
            Self::MultiBacktest,
            Self::EventPerformance,
            Self::AutoUpdateStatus,
            Self::AutoUpdateEnable,
            Self::AutoUpdateDisable,
            Self::AutoUpdateTrigger,
        ]
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

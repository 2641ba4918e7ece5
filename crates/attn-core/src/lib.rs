//! Core domain types for the attention dashboard data layer.
//!
//! This crate provides the payloads shared by every other crate:
//! - `Timeframe`, `Candle`: price series
//! - `AttentionPoint`, `AttentionEvent`, `NewsItem`, `SummaryStats`: attention data
//! - `BacktestParams`, `BacktestSummary`, `EquityPoint`: strategy runs
//! - `PriceTick`, `AttentionTick`: live push updates
//! - `AsyncState`: per-fetch-site request bookkeeping

pub mod backtest;
pub mod error;
pub mod live;
pub mod market;
pub mod state;

pub use backtest::{
    AttentionCondition, BacktestParams, BacktestResult, BacktestSummary, EquityPoint,
    MultiBacktestParams,
};
pub use error::{CoreError, Result};
pub use live::{AttentionTick, PriceTick};
pub use market::{
    normalize_symbol, AttentionEvent, AttentionPoint, Candle, NewsCount, NewsItem, NewsTrendPoint,
    SummaryStats, Timeframe,
};
pub use state::{AsyncState, AsyncStatus};

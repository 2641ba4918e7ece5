//! REST polling fallback used while a push channel is down.

use crate::status::ChannelKind;
use crate::transport::BoxFuture;
use crate::update::LiveUpdate;
use attn_core::Timeframe;
use attn_gateway::{DashboardApi, GatewayResult};

/// Source of the latest value for a kind, pulled on demand.
pub trait FallbackSource: Send + Sync {
    /// `Ok(None)` when the backend has no value yet.
    fn poll(&self, kind: ChannelKind) -> BoxFuture<'_, GatewayResult<Option<LiveUpdate>>>;
}

/// Polls the latest candle / attention point through the gateway.
pub struct ApiFallback {
    api: DashboardApi,
    symbol: String,
    timeframe: Timeframe,
}

impl ApiFallback {
    pub fn new(api: DashboardApi, symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            api,
            symbol: symbol.into(),
            timeframe,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl FallbackSource for ApiFallback {
    fn poll(&self, kind: ChannelKind) -> BoxFuture<'_, GatewayResult<Option<LiveUpdate>>> {
        Box::pin(async move {
            Ok(match kind {
                ChannelKind::Price => self
                    .api
                    .latest_price(&self.symbol, self.timeframe)
                    .await?
                    .map(LiveUpdate::Price),
                ChannelKind::Attention => self
                    .api
                    .latest_attention(&self.symbol, self.timeframe)
                    .await?
                    .map(LiveUpdate::Attention),
            })
        })
    }
}

//! Live updates published to consumers.

use crate::error::RealtimeResult;
use crate::status::ChannelKind;
use attn_core::{AttentionTick, PriceTick};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A live value for one kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LiveUpdate {
    Price(PriceTick),
    Attention(AttentionTick),
}

impl LiveUpdate {
    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::Price(_) => ChannelKind::Price,
            Self::Attention(_) => ChannelKind::Attention,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::Price(tick) => &tick.symbol,
            Self::Attention(tick) => &tick.symbol,
        }
    }

    /// Decode a push frame for a channel kind.
    pub fn decode(kind: ChannelKind, text: &str) -> RealtimeResult<Self> {
        Ok(match kind {
            ChannelKind::Price => Self::Price(serde_json::from_str(text)?),
            ChannelKind::Attention => Self::Attention(serde_json::from_str(text)?),
        })
    }
}

/// Where an update came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateSource {
    Push,
    Poll,
}

/// Update plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveEvent {
    pub update: LiveUpdate,
    pub source: UpdateSource,
    pub received_at: DateTime<Utc>,
}

impl LiveEvent {
    pub fn new(update: LiveUpdate, source: UpdateSource) -> Self {
        Self {
            update,
            source,
            received_at: Utc::now(),
        }
    }
}

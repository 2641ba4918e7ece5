//! Live update payloads carried by the push channels.

use serde::{Deserialize, Serialize};

/// Latest price for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub symbol: String,
    pub price: f64,
    /// Exchange timestamp (ms since epoch).
    pub timestamp: i64,
}

/// Latest attention score for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionTick {
    pub symbol: String,
    pub attention_score: f64,
    pub timestamp: i64,
}

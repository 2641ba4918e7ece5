//! Live channel error types.
//!
//! These never reach consumers: channel tasks fold them into
//! `ConnectionStatus` and back off.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RealtimeError {
    /// The channel cannot be constructed (no URL, unsupported scheme).
    #[error("Channel unavailable: {0}")]
    Unavailable(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    /// No frame arrived within the idle timeout.
    #[error("Idle timeout after {0}ms")]
    IdleTimeout(u64),

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RealtimeError {
    /// Short label used as the reconnect metric reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::ConnectionFailed(_) => "connect_failed",
            Self::ConnectionClosed { .. } => "closed",
            Self::IdleTimeout(_) => "idle",
            Self::Tungstenite(_) => "transport",
            Self::Json(_) => "decode",
        }
    }
}

pub type RealtimeResult<T> = Result<T, RealtimeError>;

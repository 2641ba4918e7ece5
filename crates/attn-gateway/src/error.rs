//! Gateway error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// No response was received (connect/DNS/reset).
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded its time budget.
    #[error("Request to {endpoint} timed out after {timeout_ms}ms")]
    Timeout {
        endpoint: &'static str,
        timeout_ms: u64,
    },

    /// Non-2xx response.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Whether a retry may succeed (the consumer shows "retry" rather than "failed").
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short label used as the metrics outcome.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout { .. } => "timeout",
            Self::Http { .. } => "http",
            Self::Decode(_) => "decode",
            Self::Cancelled => "cancelled",
            Self::InvalidRequest(_) => "invalid",
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(GatewayError::Network("reset".into()).is_retryable());
        assert!(GatewayError::Timeout {
            endpoint: "price_series",
            timeout_ms: 10
        }
        .is_retryable());
        assert!(GatewayError::Http {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!GatewayError::Http {
            status: 404,
            body: String::new()
        }
        .is_retryable());
        assert!(!GatewayError::Cancelled.is_retryable());
    }
}

//! Loader error types.

use attn_gateway::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    /// The mandatory price window could not be loaded.
    #[error("Critical data failed: {0}")]
    Critical(#[source] GatewayError),

    /// Not issued because the critical wave failed.
    #[error("Skipped: critical wave failed")]
    CriticalFailed,

    #[error("View load cancelled")]
    Cancelled,
}

impl LoaderError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type LoaderResult<T> = Result<T, LoaderError>;

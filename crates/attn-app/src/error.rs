//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Core(#[from] attn_core::CoreError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] attn_gateway::GatewayError),

    #[error("Realtime error: {0}")]
    Realtime(#[from] attn_realtime::RealtimeError),

    #[error("Loader error: {0}")]
    Loader(#[from] attn_loader::LoaderError),

    #[error("Storage error: {0}")]
    Storage(#[from] attn_presets::StorageError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] attn_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

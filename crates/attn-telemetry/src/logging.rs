//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when neither `RUST_LOG` nor a configured level is set.
const DEFAULT_FILTER: &str = "info,attn=debug";

/// Initialize structured logging with the default filter.
pub fn init_logging() -> TelemetryResult<()> {
    init_logging_with(None)
}

/// Initialize structured logging.
///
/// `RUST_LOG` wins over `level`; `level` wins over the default filter.
/// JSON output when `RUST_ENV=production`, pretty output otherwise.
pub fn init_logging_with(level: Option<&str>) -> TelemetryResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(level.filter(|l| !l.is_empty()).unwrap_or(DEFAULT_FILTER))
    });

    let is_production = std::env::var("RUST_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    let result = if is_production {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(true))
            .try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

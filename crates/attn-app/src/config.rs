//! Application configuration.

use crate::error::{AppError, AppResult};
use attn_core::Timeframe;
use attn_gateway::{GatewayConfig, TimeoutBudgets};
use attn_loader::LoaderConfig;
use attn_realtime::RealtimeConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const CONFIG_ENV_VAR: &str = "ATTN_CONFIG";

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub realtime: LiveConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub presets: PresetsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// REST backend and gateway cache.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_short_timeout_secs")]
    pub short_timeout_secs: u64,
    #[serde(default = "default_standard_timeout_secs")]
    pub standard_timeout_secs: u64,
    #[serde(default = "default_long_timeout_secs")]
    pub long_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_max_entries() -> usize {
    100
}

fn default_short_timeout_secs() -> u64 {
    10
}

fn default_standard_timeout_secs() -> u64 {
    30
}

fn default_long_timeout_secs() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_entries: default_max_entries(),
            short_timeout_secs: default_short_timeout_secs(),
            standard_timeout_secs: default_standard_timeout_secs(),
            long_timeout_secs: default_long_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            max_entries: self.max_entries,
            timeouts: TimeoutBudgets {
                short: Duration::from_secs(self.short_timeout_secs),
                standard: Duration::from_secs(self.standard_timeout_secs),
                long: Duration::from_secs(self.long_timeout_secs),
            },
        }
    }
}

/// Live channels plus the symbol they follow.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    #[serde(flatten)]
    pub channels: RealtimeConfig,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_timeframe")]
    pub timeframe: Timeframe,
}

fn default_symbol() -> String {
    "BTC".to_string()
}

fn default_timeframe() -> Timeframe {
    Timeframe::Hour1
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            channels: RealtimeConfig::default(),
            symbol: default_symbol(),
            timeframe: default_timeframe(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresetsConfig {
    /// JSON file holding presets and results.
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("data/presets.json")
}

impl Default for PresetsConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetryConfig {
    /// Filter directive; `RUST_LOG` still wins.
    #[serde(default)]
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Resolve the config path: explicit > `ATTN_CONFIG` > default file.
    pub fn resolve_path(explicit: Option<String>) -> String {
        explicit
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the gateway unusable. Push URLs are
    /// checked later; a bad one only disables that channel.
    pub fn validate(&self) -> AppResult<()> {
        let base = Url::parse(&self.api.base_url)
            .map_err(|e| AppError::Config(format!("Invalid api.base_url: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "api.base_url must be http(s), got {}",
                base.scheme()
            )));
        }
        if self.api.short_timeout_secs == 0
            || self.api.standard_timeout_secs == 0
            || self.api.long_timeout_secs == 0
        {
            return Err(AppError::Config("api timeouts must be positive".to_string()));
        }
        if self.realtime.symbol.trim().is_empty() {
            return Err(AppError::Config("realtime.symbol is empty".to_string()));
        }
        Ok(())
    }
}

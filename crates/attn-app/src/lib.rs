//! Headless attention dashboard client.
//!
//! Wires the gateway, progressive loader, live channels and preset store
//! from one TOML configuration.

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, ViewReport, WatchSummary};
pub use config::AppConfig;
pub use error::{AppError, AppResult};

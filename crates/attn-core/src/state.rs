//! Per-fetch-site request state.
//!
//! One `AsyncState` belongs to one logical fetch site (a chart, a table), never
//! to the whole application. A refresh moves back to `Loading` while keeping
//! the previous `data`, so a consumer can keep showing the last result.

use chrono::{DateTime, Utc};

/// Request lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AsyncStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl std::fmt::Display for AsyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Request state with stale-while-revalidating data.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncState<T> {
    pub status: AsyncStatus,
    pub data: Option<T>,
    pub error: Option<String>,
    /// Time of the last successful completion.
    pub last_updated: Option<DateTime<Utc>>,
}

impl<T> Default for AsyncState<T> {
    fn default() -> Self {
        Self {
            status: AsyncStatus::Idle,
            data: None,
            error: None,
            last_updated: None,
        }
    }
}

impl<T> AsyncState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `Loading`. Previous data is kept, the previous error is cleared.
    pub fn begin(&mut self) {
        self.status = AsyncStatus::Loading;
        self.error = None;
    }

    /// Complete successfully.
    pub fn succeed(&mut self, data: T) {
        self.status = AsyncStatus::Success;
        self.data = Some(data);
        self.error = None;
        self.last_updated = Some(Utc::now());
    }

    /// Complete with an error. Previous data stays visible.
    pub fn fail(&mut self, error: impl std::fmt::Display) {
        self.status = AsyncStatus::Error;
        self.error = Some(error.to_string());
    }

    /// Record the outcome of a finished request.
    pub fn settle<E: std::fmt::Display>(&mut self, outcome: std::result::Result<T, E>) {
        match outcome {
            Ok(data) => self.succeed(data),
            Err(e) => self.fail(e),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == AsyncStatus::Loading
    }

    /// True while a refresh runs on top of earlier data.
    pub fn is_refreshing(&self) -> bool {
        self.is_loading() && self.data.is_some()
    }
}

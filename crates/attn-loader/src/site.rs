//! Fetch-site bookkeeping around `AsyncState`.

use attn_core::{AsyncState, AsyncStatus};
use parking_lot::Mutex;
use std::fmt::Display;
use std::future::Future;
use tokio::sync::watch;
use tracing::debug;

/// One logical fetch site (a chart, a table).
///
/// Each `run` moves the state to `Loading` while keeping previous data. Only
/// the most recent run may settle the state; an older run that resolves late
/// is discarded, so a stale error never replaces fresher data.
pub struct FetchSite<T> {
    name: &'static str,
    state: watch::Sender<AsyncState<T>>,
    generation: Mutex<u64>,
}

impl<T: Clone + Send + Sync + 'static> FetchSite<T> {
    pub fn new(name: &'static str) -> Self {
        let (state, _) = watch::channel(AsyncState::new());
        Self {
            name,
            state,
            generation: Mutex::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn snapshot(&self) -> AsyncState<T> {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> AsyncStatus {
        self.state.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<AsyncState<T>> {
        self.state.subscribe()
    }

    /// Await `fut` and record its outcome. Returns false if a newer run
    /// superseded this one and the outcome was dropped.
    pub async fn run<F, E>(&self, fut: F) -> bool
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        let generation = {
            let mut current = self.generation.lock();
            *current += 1;
            *current
        };
        self.state.send_modify(AsyncState::begin);

        let outcome = fut.await;

        if *self.generation.lock() != generation {
            debug!(site = self.name, generation, "Discarding superseded result");
            return false;
        }
        self.state.send_modify(|state| state.settle(outcome));
        true
    }
}

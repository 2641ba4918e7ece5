//! Live connection manager.
//!
//! Owns one push channel per kind (price, attention). Each channel runs in its
//! own task:
//!
//! ```text
//! Connecting -> Connected -> Disconnected -> (backoff) -> Connecting
//!            -> Error -> (backoff) -> Connecting
//! Unavailable (terminal; no URL or not ws/wss)
//! ```
//!
//! While a channel is not connected, its kind is polled through the fallback
//! source on a fixed interval. Push and poll values go out on the same
//! broadcast stream, tagged with their source.

use crate::backoff::BackoffConfig;
use crate::error::{RealtimeError, RealtimeResult};
use crate::fallback::FallbackSource;
use crate::status::{ChannelKind, ConnectionSnapshot, ConnectionStatus, PairStatus};
use crate::transport::{FrameStream, PushFrame, PushTransport};
use crate::update::{LiveEvent, LiveUpdate, UpdateSource};
use attn_telemetry::Metrics;
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Realtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Price push URL; `None` makes the channel unavailable.
    #[serde(default)]
    pub price_url: Option<String>,
    #[serde(default)]
    pub attention_url: Option<String>,
    #[serde(default)]
    pub backoff: BackoffConfig,
    /// Fallback polling interval.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// A connected channel silent for this long is treated as disconnected.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// A connect attempt (handshake included) still pending after this long
    /// counts as failed.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Broadcast buffer; slow subscribers lag past this many updates.
    #[serde(default = "default_update_capacity")]
    pub update_capacity: usize,
}

fn default_poll_interval_ms() -> u64 {
    15000
}

fn default_idle_timeout_ms() -> u64 {
    60000
}

fn default_connect_timeout_ms() -> u64 {
    10000
}

fn default_update_capacity() -> usize {
    256
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            price_url: None,
            attention_url: None,
            backoff: BackoffConfig::default(),
            poll_interval_ms: default_poll_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            update_capacity: default_update_capacity(),
        }
    }
}

impl RealtimeConfig {
    pub fn url(&self, kind: ChannelKind) -> Option<&str> {
        match kind {
            ChannelKind::Price => self.price_url.as_deref(),
            ChannelKind::Attention => self.attention_url.as_deref(),
        }
    }
}

/// Check that a push URL is usable.
pub fn validate_push_url(url: Option<&str>) -> RealtimeResult<String> {
    let raw = url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| RealtimeError::Unavailable("no URL configured".to_string()))?;
    let parsed = url::Url::parse(raw)
        .map_err(|e| RealtimeError::Unavailable(format!("invalid URL {raw}: {e}")))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(raw.to_string()),
        other => Err(RealtimeError::Unavailable(format!(
            "unsupported scheme {other}"
        ))),
    }
}

/// Shared status cell; every change goes through here so metrics and logs
/// stay in step with the published snapshot.
struct StatusCell {
    tx: watch::Sender<ConnectionSnapshot>,
}

impl StatusCell {
    fn set(&self, kind: ChannelKind, status: ConnectionStatus) {
        let changed = self.tx.send_if_modified(|snapshot| snapshot.set(kind, status));
        if changed {
            debug!(kind = %kind, status = %status, "Channel status");
            Metrics::channel_state_set(kind.as_str(), status.as_str());
        }
    }

    fn get(&self, kind: ChannelKind) -> ConnectionStatus {
        self.tx.borrow().get(kind)
    }
}

/// Callback subscription handle. Dropping it also unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    fn stop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Live connection manager.
pub struct ConnectionManager {
    config: RealtimeConfig,
    transport: Arc<dyn PushTransport>,
    fallback: Arc<dyn FallbackSource>,
    status: Arc<StatusCell>,
    updates_tx: broadcast::Sender<LiveEvent>,
    /// Bumped by `reconnect_now`; channels in backoff wake on change.
    reconnect_tx: watch::Sender<u64>,
    shutdown_token: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(
        config: RealtimeConfig,
        transport: Arc<dyn PushTransport>,
        fallback: Arc<dyn FallbackSource>,
    ) -> Self {
        let (status_tx, _) = watch::channel(ConnectionSnapshot::default());
        let (updates_tx, _) = broadcast::channel(config.update_capacity.max(1));
        let (reconnect_tx, _) = watch::channel(0u64);
        Self {
            config,
            transport,
            fallback,
            status: Arc::new(StatusCell { tx: status_tx }),
            updates_tx,
            reconnect_tx,
            shutdown_token: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Spawn channel and poller tasks. Calling twice is a no-op.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() || self.shutdown_token.is_cancelled() {
            return;
        }

        for kind in ChannelKind::all() {
            match validate_push_url(self.config.url(kind)) {
                Ok(url) => {
                    let worker = ChannelWorker {
                        kind,
                        url,
                        transport: self.transport.clone(),
                        status: self.status.clone(),
                        updates_tx: self.updates_tx.clone(),
                        reconnect_rx: self.reconnect_tx.subscribe(),
                        shutdown_token: self.shutdown_token.clone(),
                        backoff: self.config.backoff,
                        idle_timeout: Duration::from_millis(self.config.idle_timeout_ms),
                        connect_timeout: Duration::from_millis(
                            self.config.connect_timeout_ms.max(1),
                        ),
                    };
                    tasks.push(tokio::spawn(worker.run()));
                }
                Err(e) => {
                    warn!(kind = %kind, error = %e, "Push channel unavailable, polling only");
                    self.status.set(kind, ConnectionStatus::Unavailable);
                }
            }

            let poller = Poller {
                kind,
                fallback: self.fallback.clone(),
                status: self.status.clone(),
                updates_tx: self.updates_tx.clone(),
                shutdown_token: self.shutdown_token.clone(),
                interval: Duration::from_millis(self.config.poll_interval_ms.max(1)),
            };
            tasks.push(tokio::spawn(poller.run()));
        }

        info!(tasks = tasks.len(), "ConnectionManager started");
    }

    /// Stop all tasks. Channels end up `Disconnected`; `Unavailable` ones stay
    /// as they are.
    pub async fn dispose(&self) {
        info!("ConnectionManager dispose requested");
        self.shutdown_token.cancel();

        let handles: Vec<_> = self.tasks.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!(error = %e, "Channel task panicked");
                }
            }
        }

        for kind in ChannelKind::all() {
            if self.status.get(kind) != ConnectionStatus::Unavailable {
                self.status.set(kind, ConnectionStatus::Disconnected);
            }
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Interrupt any pending backoff or in-flight connect attempt and
    /// reconnect immediately. Connected channels are left alone.
    pub fn reconnect_now(&self) {
        info!("Immediate reconnect requested");
        self.reconnect_tx.send_modify(|generation| *generation += 1);
    }

    pub fn status(&self) -> ConnectionSnapshot {
        *self.status.tx.borrow()
    }

    pub fn channel_status(&self, kind: ChannelKind) -> ConnectionStatus {
        self.status.get(kind)
    }

    pub fn pair_status(&self) -> PairStatus {
        self.status().pair()
    }

    /// Status receiver; drop it to unsubscribe.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.status.tx.subscribe()
    }

    /// Update receiver; drop it to unsubscribe.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<LiveEvent> {
        self.updates_tx.subscribe()
    }

    /// Invoke `callback` for each update until unsubscribed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&LiveEvent) + Send + Sync + 'static,
    {
        let mut rx = self.updates_tx.subscribe();
        let token = self.shutdown_token.child_token();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = task_token.cancelled() => return,
                    received = rx.recv() => match received {
                        Ok(event) => callback(&event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Subscriber lagged, updates skipped");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                }
            }
        });

        Subscription {
            token,
            handle: Some(handle),
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

/// Why a connected session ended.
enum SessionEnd {
    Shutdown,
    Lost(RealtimeError),
    Ended,
}

struct ChannelWorker {
    kind: ChannelKind,
    url: String,
    transport: Arc<dyn PushTransport>,
    status: Arc<StatusCell>,
    updates_tx: broadcast::Sender<LiveEvent>,
    reconnect_rx: watch::Receiver<u64>,
    shutdown_token: CancellationToken,
    backoff: BackoffConfig,
    idle_timeout: Duration,
    connect_timeout: Duration,
}

impl ChannelWorker {
    async fn run(mut self) {
        let kind = self.kind;
        let mut attempt = 0u32;

        loop {
            if self.shutdown_token.is_cancelled() {
                self.status.set(kind, ConnectionStatus::Disconnected);
                return;
            }

            // Requests made before this attempt are satisfied by it.
            self.reconnect_rx.borrow_and_update();
            self.status.set(kind, ConnectionStatus::Connecting);

            let connect =
                tokio::time::timeout(self.connect_timeout, self.transport.connect(&self.url));
            let connected = tokio::select! {
                biased;
                () = self.shutdown_token.cancelled() => {
                    self.status.set(kind, ConnectionStatus::Disconnected);
                    return;
                }
                changed = self.reconnect_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    info!(kind = %kind, "Connect attempt restarted");
                    continue;
                }
                result = connect => result.unwrap_or_else(|_| {
                    Err(RealtimeError::ConnectionFailed(format!(
                        "connect timed out after {} ms",
                        self.connect_timeout.as_millis()
                    )))
                }),
            };

            let reason = match connected {
                Ok(stream) => {
                    info!(kind = %kind, url = %self.url, "Push channel connected");
                    self.status.set(kind, ConnectionStatus::Connected);
                    attempt = 0;

                    let end = self.pump(stream).await;
                    // Requests made while connected do not shorten the next backoff.
                    self.reconnect_rx.borrow_and_update();

                    match end {
                        SessionEnd::Shutdown => {
                            self.status.set(kind, ConnectionStatus::Disconnected);
                            return;
                        }
                        SessionEnd::Lost(e) => {
                            warn!(kind = %kind, error = %e, "Push channel lost");
                            self.status.set(kind, ConnectionStatus::Disconnected);
                            e.reason()
                        }
                        SessionEnd::Ended => {
                            info!(kind = %kind, "Push stream ended");
                            self.status.set(kind, ConnectionStatus::Disconnected);
                            "ended"
                        }
                    }
                }
                Err(e) => {
                    error!(kind = %kind, error = %e, "Push connect failed");
                    self.status.set(kind, ConnectionStatus::Error);
                    e.reason()
                }
            };

            attempt += 1;
            let delay = self.backoff.delay(attempt);
            Metrics::channel_reconnect(kind.as_str(), reason);
            warn!(kind = %kind, attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            // Cancellation-aware backoff, cut short by reconnect_now.
            tokio::select! {
                biased;
                () = self.shutdown_token.cancelled() => {
                    self.status.set(kind, ConnectionStatus::Disconnected);
                    return;
                }
                changed = self.reconnect_rx.changed() => {
                    if changed.is_err() {
                        // Manager dropped without dispose.
                        return;
                    }
                    info!(kind = %kind, "Backoff interrupted");
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn pump(&self, mut stream: FrameStream) -> SessionEnd {
        let idle = tokio::time::sleep(self.idle_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                biased;
                () = self.shutdown_token.cancelled() => return SessionEnd::Shutdown,
                frame = stream.next() => match frame {
                    Some(Ok(frame)) => {
                        idle.as_mut().reset(Instant::now() + self.idle_timeout);
                        if let PushFrame::Text(text) = frame {
                            self.publish(&text);
                        }
                    }
                    Some(Err(e)) => return SessionEnd::Lost(e),
                    None => return SessionEnd::Ended,
                },
                () = &mut idle => {
                    return SessionEnd::Lost(RealtimeError::IdleTimeout(
                        self.idle_timeout.as_millis() as u64,
                    ));
                }
            }
        }
    }

    fn publish(&self, text: &str) {
        match LiveUpdate::decode(self.kind, text) {
            Ok(update) => {
                // No receivers is fine.
                let _ = self
                    .updates_tx
                    .send(LiveEvent::new(update, UpdateSource::Push));
            }
            Err(e) => {
                warn!(kind = %self.kind, error = %e, "Skipping undecodable push frame");
            }
        }
    }
}

struct Poller {
    kind: ChannelKind,
    fallback: Arc<dyn FallbackSource>,
    status: Arc<StatusCell>,
    updates_tx: broadcast::Sender<LiveEvent>,
    shutdown_token: CancellationToken,
    interval: Duration,
}

impl Poller {
    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.shutdown_token.cancelled() => return,
                _ = ticker.tick() => {}
            }

            if self.status.get(self.kind).is_connected() {
                continue;
            }

            let polled = tokio::select! {
                biased;
                () = self.shutdown_token.cancelled() => return,
                result = self.fallback.poll(self.kind) => result,
            };

            match polled {
                Ok(Some(update)) => {
                    if self.status.get(self.kind).is_connected() {
                        // Push took over while the poll was in flight.
                        Metrics::poll_fallback(self.kind.as_str(), "superseded");
                        debug!(kind = %self.kind, "Dropping superseded poll result");
                        continue;
                    }
                    Metrics::poll_fallback(self.kind.as_str(), "ok");
                    let _ = self
                        .updates_tx
                        .send(LiveEvent::new(update, UpdateSource::Poll));
                }
                Ok(None) => Metrics::poll_fallback(self.kind.as_str(), "empty"),
                Err(e) => {
                    Metrics::poll_fallback(self.kind.as_str(), "error");
                    warn!(kind = %self.kind, error = %e, "Fallback poll failed");
                }
            }
        }
    }
}

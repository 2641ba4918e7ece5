//! Application wiring.
//!
//! Owns one gateway, loader and preset store. Live channels are created per
//! `watch` run and disposed when it ends.

use crate::config::AppConfig;
use crate::error::AppResult;
use attn_core::{normalize_symbol, Timeframe};
use attn_gateway::{DashboardApi, HttpTransport, ReqwestTransport, RequestGateway};
use attn_loader::{BackgroundData, CriticalData, ProgressiveLoader, SecondaryData, ViewLoad};
use attn_presets::{JsonFileStore, KeyValueStore, PresetStore};
use attn_realtime::{
    ApiFallback, ConnectionManager, LiveEvent, PairStatus, PushTransport, TungsteniteTransport,
    UpdateSource,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Outcome of a full view load. Only the critical wave is mandatory.
#[derive(Debug)]
pub struct ViewReport {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub critical: CriticalData,
    pub secondary: Result<SecondaryData, String>,
    pub background: Result<BackgroundData, String>,
}

/// Counters collected during a `watch` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSummary {
    pub push_updates: usize,
    pub poll_updates: usize,
    pub status_changes: usize,
    /// Pair status just before the channels were torn down.
    pub last_pair_status: PairStatus,
}

impl WatchSummary {
    fn new(initial: PairStatus) -> Self {
        Self {
            push_updates: 0,
            poll_updates: 0,
            status_changes: 0,
            last_pair_status: initial,
        }
    }

    fn record(&mut self, event: &LiveEvent) {
        match event.source {
            UpdateSource::Push => self.push_updates += 1,
            UpdateSource::Poll => self.poll_updates += 1,
        }
    }
}

pub struct Application {
    config: AppConfig,
    api: DashboardApi,
    loader: ProgressiveLoader,
    presets: PresetStore,
    push_transport: Arc<dyn PushTransport>,
}

impl Application {
    /// Production wiring: reqwest, tungstenite and the JSON preset file.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let http: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
        let store: Arc<dyn KeyValueStore> =
            Arc::new(JsonFileStore::open(&config.presets.storage_path)?);
        Ok(Self::with_parts(
            config,
            http,
            Arc::new(TungsteniteTransport::new()),
            store,
        ))
    }

    pub fn with_parts(
        config: AppConfig,
        http: Arc<dyn HttpTransport>,
        push_transport: Arc<dyn PushTransport>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let gateway = Arc::new(RequestGateway::new(config.api.gateway_config(), http));
        let api = DashboardApi::new(gateway);
        let loader = ProgressiveLoader::new(api.clone(), config.loader.clone());
        let presets = PresetStore::new(store);

        Self {
            config,
            api,
            loader,
            presets,
            push_transport,
        }
    }

    /// One-time startup work: imports presets saved under the legacy key
    /// layout. Returns the number of migrated names.
    pub fn init(&self) -> usize {
        let migrated = self.presets.migrate_legacy();
        info!(
            base_url = %self.config.api.base_url,
            migrated_presets = migrated,
            "Application initialized"
        );
        migrated
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn api(&self) -> &DashboardApi {
        &self.api
    }

    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }

    /// Load every wave of a view. Fails only if the symbol is malformed or
    /// the critical wave fails.
    pub async fn view(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        cancel: CancellationToken,
    ) -> AppResult<ViewReport> {
        let symbol = normalize_symbol(symbol)?;
        let ViewLoad {
            symbol,
            timeframe,
            critical,
            secondary,
            background,
        } = self.loader.load_view(symbol, timeframe, cancel);

        let critical = critical.await?;
        info!(
            symbol = %symbol,
            timeframe = %timeframe,
            candles = critical.candles.len(),
            has_summary = critical.summary.is_some(),
            "Critical data ready"
        );

        let secondary = secondary.await.map_err(|e| e.to_string());
        if let Err(e) = &secondary {
            warn!(symbol = %symbol, error = %e, "Secondary data unavailable");
        }
        let background = background.await.map_err(|e| e.to_string());
        if let Err(e) = &background {
            warn!(symbol = %symbol, error = %e, "Background data unavailable");
        }

        Ok(ViewReport {
            symbol,
            timeframe,
            critical,
            secondary,
            background,
        })
    }

    /// Start live channels for `symbol`. The caller owns disposal.
    pub fn connect_live(&self, symbol: &str, timeframe: Timeframe) -> ConnectionManager {
        let fallback = Arc::new(ApiFallback::new(self.api.clone(), symbol, timeframe));
        let manager = ConnectionManager::new(
            self.config.realtime.channels.clone(),
            self.push_transport.clone(),
            fallback,
        );
        manager.start();
        manager
    }

    /// Follow live updates until `duration` elapses or `shutdown` fires.
    pub async fn watch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        duration: Duration,
        shutdown: CancellationToken,
    ) -> AppResult<WatchSummary> {
        let symbol = normalize_symbol(symbol)?;
        let manager = self.connect_live(&symbol, timeframe);
        let mut updates = manager.subscribe_updates();
        let mut status = manager.subscribe_status();
        let mut summary = WatchSummary::new(manager.pair_status());

        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                () = &mut deadline => break,
                () = shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = *status.borrow_and_update();
                    summary.status_changes += 1;
                    summary.last_pair_status = snapshot.pair();
                    info!(
                        price = snapshot.price.as_str(),
                        attention = snapshot.attention.as_str(),
                        pair = snapshot.pair().as_str(),
                        "Connection status"
                    );
                }
                received = updates.recv() => match received {
                    Ok(event) => {
                        summary.record(&event);
                        info!(
                            kind = event.update.kind().as_str(),
                            symbol = event.update.symbol(),
                            source = ?event.source,
                            "Live update"
                        );
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Watch lagged, updates skipped");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        manager.dispose().await;
        info!(
            push = summary.push_updates,
            poll = summary.poll_updates,
            status_changes = summary.status_changes,
            "Watch finished"
        );
        Ok(summary)
    }
}

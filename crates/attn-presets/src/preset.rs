//! Named backtest presets and their last computed results.
//!
//! A preset (parameters) and its result (summary + equity curve) are separate
//! records keyed by the same name, so either can exist without the other.
//! Storage failures are logged and degrade to "no data"; nothing here returns
//! a storage error to the caller.

use crate::keys::{
    self, EQUITY_PREFIX, LEGACY_EQUITY_PREFIX, LEGACY_PRESET_PREFIX, LEGACY_SUMMARY_PREFIX,
    PRESET_PREFIX, SUMMARY_PREFIX,
};
use crate::error::{StorageError, StorageResult};
use crate::store::KeyValueStore;
use attn_core::{AttentionCondition, BacktestParams, BacktestSummary, EquityPoint};
use attn_telemetry::Metrics;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default number of presets that can be compared side by side.
pub const DEFAULT_MAX_COMPARE: usize = 3;

/// Saved parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: Uuid,
    pub name: String,
    pub params: BacktestParams,
    #[serde(default)]
    pub attention_condition: Option<AttentionCondition>,
    pub created_at: DateTime<Utc>,
}

/// Last computed result for a preset name.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetResult {
    pub summary: BacktestSummary,
    pub equity_curve: Vec<EquityPoint>,
}

/// One row of the comparison overview.
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewEntry {
    pub name: String,
    pub has_preset: bool,
    pub summary: Option<BacktestSummary>,
    /// No result recorded yet.
    pub needs_run: bool,
}

/// Preset persistence over a `KeyValueStore`.
///
/// Reads always go to the store; nothing is cached in memory.
#[derive(Clone)]
pub struct PresetStore {
    store: Arc<dyn KeyValueStore>,
}

impl PresetStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Upsert a preset. Re-saving keeps the original id and creation time;
    /// the stored result is never touched. Returns true if persisted.
    pub fn save(
        &self,
        name: &str,
        params: BacktestParams,
        attention_condition: Option<AttentionCondition>,
    ) -> bool {
        let Some(name) = valid_name(name, "save") else {
            return false;
        };

        let existing = self.get(name);
        let preset = Preset {
            id: existing.as_ref().map(|p| p.id).unwrap_or_else(Uuid::new_v4),
            name: name.to_string(),
            params,
            attention_condition,
            created_at: existing.map(|p| p.created_at).unwrap_or_else(Utc::now),
        };

        let saved = self.write_json("save", &keys::preset_key(name), &preset);
        if saved {
            info!(preset = name, id = %preset.id, "Preset saved");
        }
        saved
    }

    /// Stored parameters for `name`.
    pub fn load(&self, name: &str) -> Option<BacktestParams> {
        self.get(name).map(|preset| preset.params)
    }

    pub fn get(&self, name: &str) -> Option<Preset> {
        let name = valid_name(name, "get")?;
        self.read_json("load", &keys::preset_key(name))
    }

    /// Remove the preset and its result records. Idempotent.
    pub fn delete(&self, name: &str) -> bool {
        let Some(name) = valid_name(name, "delete") else {
            return false;
        };

        let mut ok = true;
        for key in [
            keys::preset_key(name),
            keys::summary_key(name),
            keys::equity_key(name),
        ] {
            if let Err(e) = self.store.remove(&key) {
                storage_failed("delete", &key, &e);
                ok = false;
            }
        }
        if ok {
            info!(preset = name, "Preset deleted");
        }
        ok
    }

    /// Upsert the result for `name`. Works without a saved preset and never
    /// touches stored parameters.
    pub fn record_result(
        &self,
        name: &str,
        summary: &BacktestSummary,
        equity_curve: &[EquityPoint],
    ) -> bool {
        let Some(name) = valid_name(name, "record_result") else {
            return false;
        };

        let summary_key = keys::summary_key(name);
        let previous = match self.store.get(&summary_key) {
            Ok(previous) => previous,
            Err(e) => {
                storage_failed("record_result", &summary_key, &e);
                return false;
            }
        };

        if !self.write_json("record_result", &summary_key, summary) {
            return false;
        }
        if !self.write_json("record_result", &keys::equity_key(name), &equity_curve) {
            // Put the old summary back so it still matches the old curve.
            let restored = match previous {
                Some(raw) => self.store.set(&summary_key, &raw),
                None => self.store.remove(&summary_key),
            };
            if let Err(e) = restored {
                storage_failed("record_result", &summary_key, &e);
            }
            return false;
        }

        debug!(
            preset = name,
            points = equity_curve.len(),
            cumulative_return = summary.cumulative_return,
            "Preset result recorded"
        );
        true
    }

    /// Last result for `name`. A summary without an equity record yields an
    /// empty curve.
    pub fn result(&self, name: &str) -> Option<PresetResult> {
        let name = valid_name(name, "result")?;
        let summary = self.read_json::<BacktestSummary>("result", &keys::summary_key(name))?;
        let equity_curve = self
            .read_json::<Vec<EquityPoint>>("result", &keys::equity_key(name))
            .unwrap_or_default();
        Some(PresetResult {
            summary,
            equity_curve,
        })
    }

    /// Names with a preset or a result, ascending.
    pub fn list_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for prefix in [PRESET_PREFIX, SUMMARY_PREFIX] {
            match self.store.keys_with_prefix(prefix) {
                Ok(found) => names.extend(
                    found
                        .iter()
                        .filter_map(|key| keys::name_from_key(prefix, key))
                        .map(str::to_string),
                ),
                Err(e) => storage_failed("list", prefix, &e),
            }
        }
        names.into_iter().collect()
    }

    /// Valid comparison subset of `names`: existing names only, first
    /// occurrence wins, at most `max_selected`.
    pub fn compare_selection(&self, names: &[String], max_selected: usize) -> Vec<String> {
        let existing: BTreeSet<String> = self.list_names().into_iter().collect();
        let mut selected: Vec<String> = Vec::new();
        for name in names {
            if selected.len() >= max_selected {
                break;
            }
            if existing.contains(name) && !selected.contains(name) {
                selected.push(name.clone());
            }
        }
        selected
    }

    /// All names ranked by cumulative return, best first. Names without a
    /// result come last, alphabetically, flagged `needs_run`.
    pub fn overview(&self) -> Vec<OverviewEntry> {
        let mut entries: Vec<OverviewEntry> = self
            .list_names()
            .into_iter()
            .map(|name| {
                let summary =
                    self.read_json::<BacktestSummary>("overview", &keys::summary_key(&name));
                let has_preset = self.has_record("overview", &keys::preset_key(&name));
                OverviewEntry {
                    needs_run: summary.is_none(),
                    name,
                    has_preset,
                    summary,
                }
            })
            .collect();

        entries.sort_by(|a, b| match (&a.summary, &b.summary) {
            (Some(x), Some(y)) => y
                .cumulative_return
                .partial_cmp(&x.cumulative_return)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        });
        entries
    }

    /// Import records under the legacy unversioned prefixes. A versioned record
    /// that already exists wins. Legacy keys are removed once handled.
    /// Returns the number of names that had anything imported.
    pub fn migrate_legacy(&self) -> usize {
        let mut migrated = BTreeSet::new();

        for (legacy_prefix, current_prefix) in [
            (LEGACY_PRESET_PREFIX, PRESET_PREFIX),
            (LEGACY_SUMMARY_PREFIX, SUMMARY_PREFIX),
            (LEGACY_EQUITY_PREFIX, EQUITY_PREFIX),
        ] {
            let legacy_keys = match self.store.keys_with_prefix(legacy_prefix) {
                Ok(found) => found,
                Err(e) => {
                    storage_failed("migrate", legacy_prefix, &e);
                    continue;
                }
            };

            for legacy_key in legacy_keys {
                let Some(name) = keys::name_from_key(legacy_prefix, &legacy_key) else {
                    continue;
                };
                match self.migrate_one(&legacy_key, &format!("{current_prefix}{name}"), name) {
                    Ok(true) => {
                        migrated.insert(name.to_string());
                    }
                    Ok(false) => {}
                    Err(e) => {
                        storage_failed("migrate", &legacy_key, &e);
                        continue;
                    }
                }
                if let Err(e) = self.store.remove(&legacy_key) {
                    storage_failed("migrate", &legacy_key, &e);
                }
            }
        }

        if !migrated.is_empty() {
            info!(count = migrated.len(), "Migrated legacy presets");
        }
        migrated.len()
    }

    fn migrate_one(&self, legacy_key: &str, current_key: &str, name: &str) -> StorageResult<bool> {
        if self.store.get(current_key)?.is_some() {
            debug!(key = legacy_key, "Versioned record exists, dropping legacy copy");
            return Ok(false);
        }
        let Some(raw) = self.store.get(legacy_key)? else {
            return Ok(false);
        };

        // Old preset records may hold bare parameters.
        let value = if current_key.starts_with(PRESET_PREFIX) {
            upgrade_legacy_preset(name, &raw)?
        } else {
            raw
        };

        self.store.set(current_key, &value)?;
        Ok(true)
    }

    fn read_json<T: DeserializeOwned>(&self, operation: &'static str, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                storage_failed(operation, key, &e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                storage_failed(operation, key, &StorageError::Corrupted(e.to_string()));
                None
            }
        }
    }

    fn has_record(&self, operation: &'static str, key: &str) -> bool {
        match self.store.get(key) {
            Ok(raw) => raw.is_some(),
            Err(e) => {
                storage_failed(operation, key, &e);
                false
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        key: &str,
        value: &T,
    ) -> bool {
        let result = serde_json::to_string(value)
            .map_err(StorageError::from)
            .and_then(|raw| self.store.set(key, &raw));
        match result {
            Ok(()) => true,
            Err(e) => {
                storage_failed(operation, key, &e);
                false
            }
        }
    }
}

fn upgrade_legacy_preset(name: &str, raw: &str) -> StorageResult<String> {
    if serde_json::from_str::<Preset>(raw).is_ok() {
        return Ok(raw.to_string());
    }
    let params: BacktestParams = serde_json::from_str(raw)
        .map_err(|e| StorageError::Corrupted(format!("legacy preset {name}: {e}")))?;
    let preset = Preset {
        id: Uuid::new_v4(),
        name: name.to_string(),
        params,
        attention_condition: None,
        created_at: Utc::now(),
    };
    Ok(serde_json::to_string(&preset)?)
}

fn valid_name<'a>(name: &'a str, operation: &'static str) -> Option<&'a str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        warn!(operation, "Ignoring blank preset name");
        return None;
    }
    Some(trimmed)
}

fn storage_failed(operation: &'static str, key: &str, error: &StorageError) {
    Metrics::preset_storage_error(operation);
    warn!(operation, key, error = %error, "Preset storage error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, MemoryStore};
    use chrono::TimeZone;

    fn params(symbol: &str, lookback_days: u32) -> BacktestParams {
        BacktestParams {
            symbol: symbol.to_string(),
            lookback_days,
            ..BacktestParams::default()
        }
    }

    fn summary(cumulative_return: f64) -> BacktestSummary {
        BacktestSummary {
            total_trades: 10,
            win_rate: 0.6,
            avg_return: 0.01,
            cumulative_return,
            max_drawdown: -0.1,
            sharpe: Some(1.2),
        }
    }

    fn curve() -> Vec<EquityPoint> {
        vec![
            EquityPoint {
                datetime: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                equity: 1.0,
            },
            EquityPoint {
                datetime: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
                equity: 1.05,
            },
        ]
    }

    fn memory() -> (PresetStore, Arc<MemoryStore>) {
        let backend = Arc::new(MemoryStore::new());
        (PresetStore::new(backend.clone()), backend)
    }

    #[test]
    fn test_save_load_round_trip() {
        let (store, _) = memory();
        assert!(store.save("trend-1", params("BTC", 30), None));
        assert_eq!(store.load("trend-1"), Some(params("BTC", 30)));
        assert!(store.load("missing").is_none());
    }

    #[test]
    fn test_resave_keeps_identity_and_result() {
        let (store, _) = memory();
        store.save("trend-1", params("BTC", 30), None);
        let first = store.get("trend-1").unwrap();
        store.record_result("trend-1", &summary(0.2), &curve());

        let condition = AttentionCondition {
            source: "news".to_string(),
            regime: "high".to_string(),
            lookback_days: 7,
        };
        store.save("trend-1", params("ETH", 60), Some(condition.clone()));

        let second = store.get("trend-1").unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.params, params("ETH", 60));
        assert_eq!(second.attention_condition, Some(condition));
        assert_eq!(store.list_names(), vec!["trend-1"]);

        let result = store.result("trend-1").unwrap();
        assert_eq!(result.summary, summary(0.2));
        assert_eq!(result.equity_curve.len(), 2);
    }

    #[test]
    fn test_record_result_does_not_touch_params() {
        let (store, _) = memory();
        store.save("a", params("BTC", 30), None);
        store.record_result("a", &summary(0.1), &[]);
        assert_eq!(store.load("a"), Some(params("BTC", 30)));
    }

    #[test]
    fn test_delete_removes_everything_and_is_idempotent() {
        let (store, backend) = memory();
        store.save("a", params("BTC", 30), None);
        store.record_result("a", &summary(0.1), &curve());

        assert!(store.delete("a"));
        assert!(store.delete("a"));
        assert!(store.get("a").is_none());
        assert!(store.result("a").is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_result_without_preset_is_listed() {
        let (store, _) = memory();
        store.save("b", params("BTC", 30), None);
        assert!(store.record_result("a", &summary(0.3), &curve()));

        assert_eq!(store.list_names(), vec!["a", "b"]);
        assert!(store.load("a").is_none());
        assert!(store.result("a").is_some());
    }

    #[test]
    fn test_blank_names_rejected() {
        let (store, backend) = memory();
        assert!(!store.save("   ", params("BTC", 30), None));
        assert!(!store.record_result("", &summary(0.1), &[]));
        assert!(store.load("").is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_names_are_trimmed() {
        let (store, _) = memory();
        store.save("  spaced  ", params("BTC", 30), None);
        assert!(store.load("spaced").is_some());
    }

    #[test]
    fn test_corrupted_record_degrades_to_none() {
        let (store, backend) = memory();
        backend.set(&keys::preset_key("bad"), "{oops").unwrap();
        backend.set(&keys::summary_key("bad"), "[1,2").unwrap();

        assert!(store.load("bad").is_none());
        assert!(store.result("bad").is_none());
        assert_eq!(store.list_names(), vec!["bad"]);
    }

    #[test]
    fn test_quota_exceeded_is_noop() {
        let backend = Arc::new(MemoryStore::with_quota(64));
        let store = PresetStore::new(backend.clone());

        assert!(!store.save("too-big", params("BTC", 30), None));
        assert!(store.get("too-big").is_none());
        assert!(backend.is_empty());
    }

    fn stored_len(key: &str, value: &impl Serialize) -> usize {
        key.len() + serde_json::to_string(value).unwrap().len()
    }

    #[test]
    fn test_failed_equity_write_keeps_previous_result() {
        let first_curve = curve()[..1].to_vec();
        let quota = stored_len(&keys::summary_key("r"), &summary(0.1))
            + stored_len(&keys::equity_key("r"), &first_curve)
            + 40;
        let store = PresetStore::new(Arc::new(MemoryStore::with_quota(quota)));
        assert!(store.record_result("r", &summary(0.1), &first_curve));

        let long_curve: Vec<EquityPoint> =
            std::iter::repeat(curve()[1].clone()).take(20).collect();
        assert!(!store.record_result("r", &summary(0.9), &long_curve));

        let result = store.result("r").unwrap();
        assert_eq!(result.summary, summary(0.1));
        assert_eq!(result.equity_curve, first_curve);
    }

    #[test]
    fn test_failed_equity_write_leaves_no_summary() {
        let quota = stored_len(&keys::summary_key("r"), &summary(0.1)) + 5;
        let backend = Arc::new(MemoryStore::with_quota(quota));
        let store = PresetStore::new(backend.clone());

        assert!(!store.record_result("r", &summary(0.1), &curve()));
        assert!(store.result("r").is_none());
        assert!(backend.is_empty());
    }

    /// Memory store whose preset records cannot be read.
    struct UnreadablePresets(MemoryStore);

    impl KeyValueStore for UnreadablePresets {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            if key.starts_with(keys::PRESET_PREFIX) {
                return Err(StorageError::Corrupted(key.to_string()));
            }
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            self.0.remove(key)
        }

        fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
            self.0.keys_with_prefix(prefix)
        }
    }

    #[test]
    fn test_overview_counts_unreadable_preset() {
        let store = PresetStore::new(Arc::new(UnreadablePresets(MemoryStore::new())));
        assert!(store.save("x", params("BTC", 30), None));
        assert!(store.record_result("x", &summary(0.2), &curve()));

        let errors = || {
            attn_telemetry::metrics::PRESET_STORAGE_ERRORS_TOTAL
                .with_label_values(&["overview"])
                .get()
        };
        let before = errors();
        let overview = store.overview();
        assert!(errors() > before);

        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].name, "x");
        assert!(!overview[0].has_preset);
        assert!(!overview[0].needs_run);
    }

    #[test]
    fn test_compare_selection_filters_and_bounds() {
        let (store, _) = memory();
        for name in ["a", "b", "c", "d"] {
            store.save(name, params("BTC", 30), None);
        }
        let requested: Vec<String> = ["d", "x", "a", "d", "b", "c"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(
            store.compare_selection(&requested, DEFAULT_MAX_COMPARE),
            vec!["d", "a", "b"]
        );
        assert_eq!(store.compare_selection(&requested, 1), vec!["d"]);
    }

    #[test]
    fn test_overview_ranking() {
        let (store, _) = memory();
        store.save("low", params("BTC", 30), None);
        store.record_result("low", &summary(0.05), &[]);
        store.record_result("high", &summary(0.40), &[]);
        store.save("fresh", params("ETH", 30), None);
        store.save("another", params("ETH", 30), None);

        let overview = store.overview();
        let names: Vec<&str> = overview.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["high", "low", "another", "fresh"]);

        assert!(!overview[0].has_preset);
        assert!(!overview[0].needs_run);
        assert!(overview[1].has_preset);
        assert!(overview[2].needs_run);
        assert!(overview[3].needs_run);
    }

    #[test]
    fn test_migrate_legacy() {
        let (store, backend) = memory();
        let legacy_preset = Preset {
            id: Uuid::new_v4(),
            name: "old".to_string(),
            params: params("SOL", 14),
            attention_condition: None,
            created_at: Utc::now(),
        };
        backend
            .set("preset:old", &serde_json::to_string(&legacy_preset).unwrap())
            .unwrap();
        backend
            .set("preset-summary:old", &serde_json::to_string(&summary(0.1)).unwrap())
            .unwrap();
        // Bare params in the legacy slot.
        backend
            .set("preset:bare", &serde_json::to_string(&params("ADA", 7)).unwrap())
            .unwrap();
        // Versioned record wins over legacy.
        store.save("kept", params("BTC", 30), None);
        backend
            .set("preset:kept", &serde_json::to_string(&params("DOGE", 1)).unwrap())
            .unwrap();

        assert_eq!(store.migrate_legacy(), 2);

        assert_eq!(store.get("old").unwrap().id, legacy_preset.id);
        assert_eq!(store.result("old").unwrap().summary, summary(0.1));
        assert_eq!(store.load("bare"), Some(params("ADA", 7)));
        assert_eq!(store.load("kept"), Some(params("BTC", 30)));
        assert!(backend.keys_with_prefix("preset").unwrap().is_empty());

        // Second run finds nothing.
        assert_eq!(store.migrate_legacy(), 0);
    }

    #[test]
    fn test_file_backed_store_shared_between_instances() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        let first = PresetStore::new(Arc::new(JsonFileStore::open(&path).unwrap()));
        let second = PresetStore::new(Arc::new(JsonFileStore::open(&path).unwrap()));

        first.save("shared", params("BTC", 30), None);
        assert_eq!(second.load("shared"), Some(params("BTC", 30)));

        second.delete("shared");
        assert!(first.get("shared").is_none());
    }

    #[test]
    fn test_save_over_corrupted_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        std::fs::write(&path, "[1, 2").unwrap();
        let store = PresetStore::new(Arc::new(JsonFileStore::open(&path).unwrap()));

        assert!(store.list_names().is_empty());
        assert!(store.save("fresh", params("ETH", 14), None));
        assert!(store.save("fresh", params("ETH", 21), None));
        assert_eq!(store.load("fresh"), Some(params("ETH", 21)));
    }
}

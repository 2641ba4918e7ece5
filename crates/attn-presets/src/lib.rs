//! Local persistence for named backtest presets.
//!
//! - `KeyValueStore`: string storage seam (`MemoryStore`, `JsonFileStore`)
//! - `PresetStore`: presets, their last results, legacy migration
//! - `CompareSelection`: up to three presets picked for comparison

pub mod error;
pub mod keys;
pub mod preset;
pub mod selection;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use preset::{OverviewEntry, Preset, PresetResult, PresetStore, DEFAULT_MAX_COMPARE};
pub use selection::CompareSelection;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

//! Storage key scheme.
//!
//! All preset records live under versioned prefixes. The unversioned prefixes
//! are only read by the legacy migration.

pub const PRESET_PREFIX: &str = "attn.v1.preset:";
pub const SUMMARY_PREFIX: &str = "attn.v1.preset-summary:";
pub const EQUITY_PREFIX: &str = "attn.v1.preset-equity:";

pub const LEGACY_PRESET_PREFIX: &str = "preset:";
pub const LEGACY_SUMMARY_PREFIX: &str = "preset-summary:";
pub const LEGACY_EQUITY_PREFIX: &str = "preset-equity:";

pub fn preset_key(name: &str) -> String {
    format!("{PRESET_PREFIX}{name}")
}

pub fn summary_key(name: &str) -> String {
    format!("{SUMMARY_PREFIX}{name}")
}

pub fn equity_key(name: &str) -> String {
    format!("{EQUITY_PREFIX}{name}")
}

/// Name part of `key`, if it carries `prefix`.
pub fn name_from_key<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(prefix).filter(|name| !name.is_empty())
}

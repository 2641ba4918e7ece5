//! Bounded TTL response cache.
//!
//! Entries expire `ttl` after they were stored and are evicted lazily when a
//! read finds them expired. Capacity is enforced FIFO: inserting a new key into
//! a full cache evicts the oldest inserted entry, regardless of access.
//!
//! The cache stores raw JSON; callers decode into their own types on a hit.

use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Cached response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub stored_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// FIFO-bounded TTL cache.
#[derive(Debug)]
pub struct TtlCache {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<String>,
    ttl: Duration,
    max_entries: usize,
}

impl TtlCache {
    /// Create a cache. `max_entries` is clamped to at least 1.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: HashMap::with_capacity(max_entries),
            order: VecDeque::with_capacity(max_entries),
            ttl,
            max_entries,
        }
    }

    /// Live value for `key`; an expired entry is removed and reported absent.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<Value> {
        let live = match self.entries.get(key) {
            Some(entry) => entry.is_live(now, self.ttl),
            None => return None,
        };

        if live {
            return self.entries.get(key).map(|entry| entry.value.clone());
        }

        trace!(key, "Evicting expired cache entry");
        self.remove(key);
        None
    }

    /// Store a value. An existing key is replaced and becomes the newest entry.
    pub fn insert(&mut self, key: String, value: Value, now: Instant) {
        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        } else {
            while self.entries.len() >= self.max_entries {
                match self.order.pop_front() {
                    Some(oldest) => {
                        trace!(key = %oldest, "Evicting oldest cache entry");
                        self.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
            },
        );
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(entry.value)
    }

    /// Drop every entry whose key starts with `prefix`.
    pub fn remove_prefix(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(prefix));
        self.order.retain(|k| !k.starts_with(prefix));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_within_ttl() {
        let mut cache = TtlCache::new(Duration::from_secs(60), 10);
        let now = Instant::now();
        cache.insert("a".to_string(), json!(1), now);

        assert_eq!(cache.get("a", now + Duration::from_secs(59)), Some(json!(1)));
    }

    #[test]
    fn test_expired_entry_evicted_on_read() {
        let mut cache = TtlCache::new(Duration::from_secs(60), 10);
        let now = Instant::now();
        cache.insert("a".to_string(), json!(1), now);

        // Expired entries still occupy a slot until read.
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a", now + Duration::from_secs(60)), None);
        assert_eq!(cache.len(), 0);
        assert!(cache.order.is_empty());
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let max = 5;
        let mut cache = TtlCache::new(Duration::from_secs(60), max);
        let now = Instant::now();

        for i in 0..=max {
            cache.insert(format!("k{i}"), json!(i), now);
        }

        assert_eq!(cache.len(), max);
        assert!(!cache.contains_key("k0"), "first inserted key is evicted");
        for i in 1..=max {
            assert!(cache.contains_key(&format!("k{i}")));
        }
    }

    #[test]
    fn test_reads_do_not_affect_eviction_order() {
        let mut cache = TtlCache::new(Duration::from_secs(60), 2);
        let now = Instant::now();
        cache.insert("a".to_string(), json!(1), now);
        cache.insert("b".to_string(), json!(2), now);

        // Reading "a" does not protect it (FIFO, not LRU).
        assert!(cache.get("a", now).is_some());
        cache.insert("c".to_string(), json!(3), now);

        assert!(!cache.contains_key("a"));
        assert!(cache.contains_key("b"));
        assert!(cache.contains_key("c"));
    }

    #[test]
    fn test_reinsert_refreshes_position_and_timestamp() {
        let mut cache = TtlCache::new(Duration::from_secs(60), 2);
        let t0 = Instant::now();
        cache.insert("a".to_string(), json!(1), t0);
        cache.insert("b".to_string(), json!(2), t0);

        let t1 = t0 + Duration::from_secs(30);
        cache.insert("a".to_string(), json!(10), t1);
        assert_eq!(cache.len(), 2);

        cache.insert("c".to_string(), json!(3), t1);
        assert!(!cache.contains_key("b"), "b is now the oldest");
        assert_eq!(
            cache.get("a", t0 + Duration::from_secs(80)),
            Some(json!(10)),
            "stored_at was refreshed by the re-insert"
        );
    }

    #[test]
    fn test_remove_prefix() {
        let mut cache = TtlCache::new(Duration::from_secs(60), 10);
        let now = Instant::now();
        cache.insert("symbols?null".to_string(), json!([]), now);
        cache.insert("summary_stats?{\"symbol\":\"BTC\"}".to_string(), json!({}), now);
        cache.insert("summary_stats?{\"symbol\":\"ETH\"}".to_string(), json!({}), now);

        assert_eq!(cache.remove_prefix("summary_stats?"), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.order.len(), 1);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut cache = TtlCache::new(Duration::from_secs(1), 0);
        let now = Instant::now();
        cache.insert("a".to_string(), json!(1), now);
        cache.insert("b".to_string(), json!(2), now);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.max_entries(), 1);
    }
}

//! Tier Store Module
//!
//! The entry store of a single tier: HashMap storage, lazy TTL expiry, and
//! synchronous capacity enforcement through the [`EvictionPolicy`].
//!
//! A `TierStore` is not synchronized; [`TieredCache`](crate::cache::TieredCache)
//! wraps each tier in its own lock.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheTier, EvictionPolicy, TierSettings, TierStats};

// == Tier Store ==
#[derive(Debug)]
pub struct TierStore<V> {
    tier: CacheTier,
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    settings: TierSettings,
    policy: EvictionPolicy,
    stats: TierStats,
    /// Monotonic access sequence used for recency ranking
    seq: u64,
}

impl<V: Clone> TierStore<V> {
    // == Constructor ==
    /// Creates an empty store for `tier` with the default eviction policy.
    pub fn new(tier: CacheTier, settings: TierSettings) -> Self {
        Self::with_policy(tier, settings, EvictionPolicy::default())
    }

    pub fn with_policy(tier: CacheTier, settings: TierSettings, policy: EvictionPolicy) -> Self {
        Self {
            tier,
            entries: HashMap::new(),
            settings,
            policy,
            stats: TierStats::new(tier, settings.capacity, settings.ttl.as_secs()),
            seq: 0,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry and its stats.
    ///
    /// If the tier is then over capacity, expired entries are reaped first and
    /// the eviction policy removes the lowest-ranked of the rest. The entry
    /// written here is never chosen as a victim unless the capacity is zero.
    ///
    /// # Arguments
    /// * `key` - The canonical cache key
    /// * `value` - The payload to store
    /// * `ttl` - Optional TTL (uses the tier TTL if None)
    ///
    /// # Returns
    /// The keys removed by the eviction policy.
    pub fn set(&mut self, key: String, value: V, ttl: Option<Duration>) -> Vec<String> {
        // Replacing a key starts a fresh entry with fresh access stats
        let seq = self.next_seq();
        let entry = CacheEntry::new(value, ttl.unwrap_or(self.settings.ttl), seq);
        self.entries.insert(key.clone(), entry);
        self.stats.record_set();

        let mut evicted = Vec::new();
        if self.entries.len() > self.settings.capacity {
            // Reap expired entries before ranking live ones
            self.purge_expired();

            evicted = self
                .policy
                .select_victims(&self.entries, self.settings.capacity, Some(&key));
            for victim in &evicted {
                self.entries.remove(victim);
            }
            self.stats.record_evictions(evicted.len());
        }

        self.stats.set_entries(self.entries.len());
        evicted
    }

    // == Get ==
    /// Retrieves a live value and records the access.
    ///
    /// An expired entry counts as a miss and is removed on the spot.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        // Lazy expiry: remove on read and count as a miss
        if expired {
            self.entries.remove(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            self.stats.set_entries(self.entries.len());
            return None;
        }

        // Update access stats used by the eviction ranking
        let seq = self.next_seq();
        let entry = self.entries.get_mut(key)?;
        entry.touch(seq);
        self.stats.record_hit();
        Some(entry.value.clone())
    }

    // == Peek ==
    /// Returns the stored entry without touching its access stats.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key).filter(|entry| !entry.is_expired())
    }

    // == Delete ==
    /// Removes an entry by key. Returns true if an entry was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.record_invalidations(1);
            self.stats.set_entries(self.entries.len());
        }
        removed
    }

    // == Keys ==
    /// Returns the keys of all live entries, sorted.
    pub fn keys(&self) -> Vec<String> {
        let now = current_timestamp_ms();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    // == Remove Matching ==
    /// Removes every entry whose key satisfies `predicate`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_matching<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        let removed = before - self.entries.len();

        self.stats.record_invalidations(removed);
        self.stats.set_entries(self.entries.len());
        removed
    }

    // == Flush ==
    /// Removes all entries. Returns the number removed.
    pub fn flush(&mut self) -> usize {
        self.remove_matching(|_| true)
    }

    // == Purge Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - self.entries.len();

        self.stats.record_expirations(removed);
        self.stats.set_entries(self.entries.len());
        removed
    }

    // == Stats ==
    pub fn stats(&self) -> TierStats {
        let mut stats = self.stats.clone();
        stats.set_entries(self.entries.len());
        stats
    }

    pub fn tier(&self) -> CacheTier {
        self.tier
    }

    pub fn settings(&self) -> TierSettings {
        self.settings
    }

    /// Number of stored entries, including expired ones not yet reaped.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn store(capacity: usize) -> TierStore<String> {
        TierStore::new(
            CacheTier::Summary,
            TierSettings::new(Duration::from_secs(300), capacity),
        )
    }

    #[test]
    fn test_store_new() {
        let store = store(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.tier(), CacheTier::Summary);
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = store(100);

        store.set("key1".to_string(), "value1".to_string(), None);

        assert_eq!(store.get("key1"), Some("value1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_missing() {
        let mut store = store(100);
        assert_eq!(store.get("nonexistent"), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_delete() {
        let mut store = store(100);

        store.set("key1".to_string(), "value1".to_string(), None);

        assert!(store.delete("key1"));
        assert!(!store.delete("key1"));
        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_overwrite_resets_access_stats() {
        let mut store = store(100);

        store.set("key1".to_string(), "value1".to_string(), None);
        store.get("key1");
        store.get("key1");
        assert_eq!(store.peek("key1").unwrap().access_count, 2);

        store.set("key1".to_string(), "value2".to_string(), None);

        assert_eq!(store.peek("key1").unwrap().access_count, 0);
        assert_eq!(store.get("key1"), Some("value2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_lazy_expiration() {
        let mut store = store(100);

        store.set(
            "key1".to_string(),
            "value1".to_string(),
            Some(Duration::from_millis(50)),
        );
        assert!(store.get("key1").is_some());

        sleep(Duration::from_millis(80));

        assert_eq!(store.keys(), Vec::<String>::new());
        assert_eq!(store.get("key1"), None);
        assert_eq!(store.len(), 0, "expired entry is physically removed on access");
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_zero_ttl_is_never_served() {
        let mut store = store(100);

        store.set("key1".to_string(), "value1".to_string(), Some(Duration::ZERO));
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_eviction_scenario() {
        let mut store = store(5);

        for i in 1..=5 {
            store.set(format!("k{}", i), format!("v{}", i), None);
        }
        for _ in 0..10 {
            store.get("k1");
        }

        let evicted = store.set("k6".to_string(), "v6".to_string(), None);

        assert_eq!(evicted, vec!["k2".to_string()]);
        assert_eq!(store.len(), 5);
        assert!(store.peek("k1").is_some());
        assert!(store.peek("k2").is_none());
        assert!(store.peek("k6").is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_eviction_prefers_expired_entries() {
        let mut store = store(2);

        store.set("stale".to_string(), "v".to_string(), Some(Duration::from_millis(20)));
        store.set("hot".to_string(), "v".to_string(), None);
        store.get("hot");
        sleep(Duration::from_millis(40));

        let evicted = store.set("new".to_string(), "v".to_string(), None);

        assert!(evicted.is_empty());
        assert_eq!(store.keys(), vec!["hot".to_string(), "new".to_string()]);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_remove_matching_and_flush() {
        let mut store = store(100);

        store.set("summary?department=A".to_string(), "1".to_string(), None);
        store.set("summary?department=B".to_string(), "2".to_string(), None);
        store.set("detail?page=1".to_string(), "3".to_string(), None);

        assert_eq!(store.remove_matching(|key| key.contains("department=A")), 1);
        assert_eq!(store.len(), 2);

        assert_eq!(store.flush(), 2);
        assert!(store.is_empty());
        assert_eq!(store.stats().invalidations, 3);
    }

    #[test]
    fn test_store_purge_expired() {
        let mut store = store(100);

        store.set("short".to_string(), "v".to_string(), Some(Duration::from_millis(30)));
        store.set("long".to_string(), "v".to_string(), Some(Duration::from_secs(10)));

        sleep(Duration::from_millis(60));

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("long").is_some());
    }

    #[test]
    fn test_store_stats() {
        let mut store = store(100);

        store.set("key1".to_string(), "value1".to_string(), None);
        store.get("key1");
        store.get("nonexistent");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.ttl_secs, 300);
    }
}

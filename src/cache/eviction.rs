//! Eviction Policy Module
//!
//! Frequency-first, recency-second victim selection for over-capacity tiers.
//!
//! Entries are ranked by `(access_count ascending, last access ascending)`:
//! the least frequently read entries go first and, among equally cold
//! entries, the least recently touched one. Each eviction pass removes a
//! fixed share of the tier so that a burst of inserts does not trigger a
//! ranking pass per `set`.

use std::collections::HashMap;

use crate::cache::CacheEntry;

/// Share of the tier removed by one eviction pass, in percent.
pub const DEFAULT_REMOVAL_PERCENT: usize = 20;

// == Eviction Policy ==
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    removal_percent: usize,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_REMOVAL_PERCENT)
    }
}

impl EvictionPolicy {
    /// Creates a policy removing `removal_percent` of the tier per pass
    /// (clamped to 0..=100).
    pub fn new(removal_percent: usize) -> Self {
        Self {
            removal_percent: removal_percent.min(100),
        }
    }

    // == Removal Target ==
    /// Number of entries to remove from a tier holding `size` entries.
    ///
    /// Zero while the tier is within capacity. Otherwise the configured share
    /// of `size`, raised when needed so the tier ends at or below capacity.
    pub fn removal_target(&self, size: usize, capacity: usize) -> usize {
        if size <= capacity {
            return 0;
        }
        let share = size * self.removal_percent / 100;
        share.max(size - capacity)
    }

    // == Select Victims ==
    /// Picks the keys to evict from an over-capacity tier.
    ///
    /// `protect` names the entry that was just written; it is excluded from
    /// ranking so a `set` is always readable by the next `get`. With a
    /// capacity of zero nothing can be kept and protection is ignored.
    pub fn select_victims<V>(
        &self,
        entries: &HashMap<String, CacheEntry<V>>,
        capacity: usize,
        protect: Option<&str>,
    ) -> Vec<String> {
        let target = self.removal_target(entries.len(), capacity);
        if target == 0 {
            return Vec::new();
        }

        let protect = protect.filter(|_| capacity > 0);
        let mut ranked: Vec<(&String, u64, u64)> = entries
            .iter()
            .filter(|(key, _)| Some(key.as_str()) != protect)
            .map(|(key, entry)| (key, entry.access_count, entry.last_access_seq))
            .collect();

        ranked.sort_unstable_by_key(|&(_, count, seq)| (count, seq));

        ranked
            .into_iter()
            .take(target)
            .map(|(key, _, _)| key.clone())
            .collect()
    }
}

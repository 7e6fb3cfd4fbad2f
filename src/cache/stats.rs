//! Cache Statistics Module
//!
//! Per-tier counters and the cache-wide snapshot returned by `stats()`.

use serde::Serialize;

use crate::cache::CacheTier;

// == Tier Stats ==
/// Counters for one tier.
#[derive(Debug, Clone, Serialize)]
pub struct TierStats {
    pub tier: CacheTier,
    /// Reads that returned a live entry
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Entries written
    pub sets: u64,
    /// Entries removed by the eviction policy
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Entries removed by invalidation or flush
    pub invalidations: u64,
    /// Current number of stored entries (live or not yet reaped)
    pub entries: usize,
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl TierStats {
    // == Constructor ==
    pub fn new(tier: CacheTier, capacity: usize, ttl_secs: u64) -> Self {
        Self {
            tier,
            hits: 0,
            misses: 0,
            sets: 0,
            evictions: 0,
            expirations: 0,
            invalidations: 0,
            entries: 0,
            capacity,
            ttl_secs,
        }
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn record_invalidations(&mut self, count: usize) {
        self.invalidations += count as u64;
    }

    pub fn set_entries(&mut self, count: usize) {
        self.entries = count;
    }
}

// == Cache Stats ==
/// Snapshot of every tier, in [`CacheTier::ALL`] order.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub tiers: Vec<TierStats>,
}

impl CacheStats {
    pub fn tier(&self, tier: CacheTier) -> Option<&TierStats> {
        self.tiers.iter().find(|stats| stats.tier == tier)
    }

    pub fn total_entries(&self) -> usize {
        self.tiers.iter().map(|stats| stats.entries).sum()
    }

    pub fn total_hits(&self) -> u64 {
        self.tiers.iter().map(|stats| stats.hits).sum()
    }

    pub fn total_misses(&self) -> u64 {
        self.tiers.iter().map(|stats| stats.misses).sum()
    }

    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.total_hits(), self.total_misses())
    }
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

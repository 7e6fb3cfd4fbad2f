//! Tiered Cache Module
//!
//! One [`TierStore`] per [`CacheTier`], each behind its own lock, exposed as a
//! single get/set/invalidate contract shared by all report endpoints.
//!
//! Every critical section is short and performs no I/O. In particular
//! [`TieredCache::get_or_try_insert_with`] releases the tier lock while the
//! loader runs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{CacheStats, CacheTier, InvalidationReason, TierSettings, TierStore};
use crate::config::Config;

/// Payload type stored by the report endpoints: pre-shaped JSON, shared
/// between concurrent readers without copying.
pub type Payload = Arc<serde_json::Value>;

// == Tiered Cache ==
#[derive(Debug)]
pub struct TieredCache<V = Payload> {
    tiers: [RwLock<TierStore<V>>; 4],
}

impl<V: Clone> TieredCache<V> {
    // == Constructor ==
    /// Creates an empty cache, asking `settings` for each tier's limits.
    pub fn new<F>(settings: F) -> Self
    where
        F: Fn(CacheTier) -> TierSettings,
    {
        Self {
            tiers: CacheTier::ALL.map(|tier| RwLock::new(TierStore::new(tier, settings(tier)))),
        }
    }

    /// Creates a cache where every tier shares the same limits.
    pub fn uniform(settings: TierSettings) -> Self {
        Self::new(|_| settings)
    }

    /// Creates a cache from the configured per-tier TTLs and capacities.
    pub fn from_config(config: &Config) -> Self {
        Self::new(|tier| config.tier_settings(tier))
    }

    fn tier(&self, tier: CacheTier) -> &RwLock<TierStore<V>> {
        &self.tiers[tier.index()]
    }

    // == Get ==
    /// Returns the live value for `key` in `tier`, or `None` on a miss.
    pub async fn get(&self, tier: CacheTier, key: &str) -> Option<V> {
        let value = self.tier(tier).write().await.get(key);
        if value.is_some() {
            debug!(%tier, key, "cache hit");
        } else {
            debug!(%tier, key, "cache miss");
        }
        value
    }

    // == Set ==
    /// Stores `value` under `key` in `tier`, evicting if the tier overflows.
    ///
    /// # Arguments
    /// * `ttl` - Optional TTL override (uses the tier TTL if None)
    pub async fn set(&self, tier: CacheTier, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let evicted = self.tier(tier).write().await.set(key.into(), value, ttl);
        if !evicted.is_empty() {
            debug!(%tier, count = evicted.len(), "evicted cold entries");
        }
    }

    // == Delete ==
    pub async fn delete(&self, tier: CacheTier, key: &str) -> bool {
        self.tier(tier).write().await.delete(key)
    }

    // == Keys ==
    /// Returns the live keys of `tier`, sorted.
    pub async fn keys(&self, tier: CacheTier) -> Vec<String> {
        self.tier(tier).read().await.keys()
    }

    // == Flush ==
    /// Empties one tier, or every tier when `tier` is `None`.
    ///
    /// Returns the number of entries removed.
    pub async fn flush(&self, tier: Option<CacheTier>) -> usize {
        let removed = match tier {
            Some(tier) => self.tier(tier).write().await.flush(),
            None => {
                let mut removed = 0;
                for tier in CacheTier::ALL {
                    removed += self.tier(tier).write().await.flush();
                }
                removed
            }
        };

        match tier {
            Some(tier) => info!("Cache flush: tier {} removed {} entries", tier, removed),
            None => info!("Cache flush: all tiers removed {} entries", removed),
        }
        removed
    }

    // == Invalidate ==
    /// Removes every entry affected by `reason`, across all tiers.
    ///
    /// Returns the number of entries removed.
    pub async fn invalidate(&self, reason: &InvalidationReason) -> usize {
        let mut removed = 0;
        for tier in CacheTier::ALL {
            removed += self
                .tier(tier)
                .write()
                .await
                .remove_matching(|key| reason.matches(key));
        }

        info!(
            "Cache invalidation ({}): removed {} entries",
            reason.label(),
            removed
        );
        removed
    }

    // == Purge Expired ==
    /// Reaps expired entries in every tier. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        let mut removed = 0;
        for tier in CacheTier::ALL {
            removed += self.tier(tier).write().await.purge_expired();
        }
        removed
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let mut tiers = Vec::with_capacity(CacheTier::ALL.len());
        for tier in CacheTier::ALL {
            tiers.push(self.tier(tier).read().await.stats());
        }
        CacheStats { tiers }
    }

    // == Get Or Try Insert ==
    /// Cache-aside read: returns the cached value, or runs `load` and caches
    /// its result.
    ///
    /// A failed load is returned unchanged and nothing is cached. No lock is
    /// held while `load` runs, so concurrent misses on the same key may each
    /// load; the last `set` wins.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        tier: CacheTier,
        key: &str,
        ttl: Option<Duration>,
        load: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(tier, key).await {
            return Ok(value);
        }

        let value = load().await?;
        self.set(tier, key, value.clone(), ttl).await;
        Ok(value)
    }
}

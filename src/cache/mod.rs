//! Cache Module
//!
//! Tiered in-memory caching with per-tier TTL, frequency/recency eviction,
//! and substring-based invalidation.

mod entry;
mod eviction;
mod invalidation;
mod key;
mod stats;
mod store;
mod tier;
mod tiered;


// Re-export public types
pub use entry::CacheEntry;
pub use eviction::{EvictionPolicy, DEFAULT_REMOVAL_PERCENT};
pub use invalidation::InvalidationReason;
pub use key::{CacheKey, CacheKeyBuilder};
pub use stats::{CacheStats, TierStats};
pub use store::TierStore;
pub use tier::{CacheTier, TierSettings};
pub use tiered::{Payload, TieredCache};

// == Public Constants ==
/// Default maximum number of entries per tier
pub const DEFAULT_TIER_CAPACITY: usize = 1000;

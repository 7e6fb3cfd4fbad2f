//! Cache Tier Module
//!
//! The fixed set of cache namespaces and their per-tier limits.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Cache Tier ==
/// An independent cache namespace with its own TTL and capacity.
///
/// The same key string stored in two tiers refers to two unrelated entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    /// Aggregated dashboard views
    Summary,
    /// Paginated row listings
    Detail,
    /// Full result sets prepared for file exports
    Export,
    /// Trend and comparison analyses
    Analytics,
}

impl CacheTier {
    /// All tiers, in storage order.
    pub const ALL: [CacheTier; 4] = [
        CacheTier::Summary,
        CacheTier::Detail,
        CacheTier::Export,
        CacheTier::Analytics,
    ];

    /// Position of this tier in [`CacheTier::ALL`].
    pub fn index(self) -> usize {
        match self {
            CacheTier::Summary => 0,
            CacheTier::Detail => 1,
            CacheTier::Export => 2,
            CacheTier::Analytics => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheTier::Summary => "summary",
            CacheTier::Detail => "detail",
            CacheTier::Export => "export",
            CacheTier::Analytics => "analytics",
        }
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CacheTier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown cache tier: {}", s))
    }
}

// == Tier Settings ==
/// Staleness budget and size bound of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierSettings {
    /// Lifetime of entries stored without an explicit TTL
    pub ttl: Duration,
    /// Maximum number of entries retained after any `set`
    pub capacity: usize,
}

impl TierSettings {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self { ttl, capacity }
    }
}

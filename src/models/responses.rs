//! Response DTOs for the administrative API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::auth::TokenStatus;
use crate::cache::{CacheStats, TierStats};

/// Response body for POST /api/cache/clear
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    /// Success message
    pub message: String,
    /// Number of entries removed
    pub removed: usize,
}

impl FlushResponse {
    pub fn new(removed: usize) -> Self {
        Self {
            message: "Cache cleared successfully".to_string(),
            removed,
        }
    }
}

/// Response body for POST /api/cache/invalidate
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// The invalidation reason that was applied
    pub reason: String,
    /// Number of entries removed across all tiers
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(reason: impl Into<String>, removed: usize) -> Self {
        Self {
            reason: reason.into(),
            removed,
        }
    }
}

/// Per-tier statistics entry
#[derive(Debug, Clone, Serialize)]
pub struct TierStatsResponse {
    #[serde(flatten)]
    pub stats: TierStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

/// Response body for GET /api/cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub tiers: Vec<TierStatsResponse>,
    pub total_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            total_entries: stats.total_entries(),
            hits: stats.total_hits(),
            misses: stats.total_misses(),
            hit_rate: stats.hit_rate(),
            tiers: stats
                .tiers
                .into_iter()
                .map(|tier| TierStatsResponse {
                    hit_rate: tier.hit_rate(),
                    stats: tier,
                })
                .collect(),
        }
    }
}

/// Response body for the health endpoint (GET /api/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub cache: StatsResponse,
    pub token: TokenStatus,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(cache: StatsResponse, token: TokenStatus) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            cache,
            token,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error kind
    pub error: String,
    /// Underlying message, omitted in production
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            error: error.into(),
            details,
        }
    }
}

//! Report Cache - resilient SQL access and tiered caching for report endpoints
//!
//! Runs queries against a remote, token-gated SQL service with transparent
//! token refresh, and caches shaped results in tiers with per-tier TTL,
//! capacity-bounded eviction and event-driven invalidation.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod query;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheKey, CacheTier, InvalidationReason, TieredCache};
pub use config::Config;
pub use error::{ApiError, QueryError};
pub use gateway::ReportGateway;
pub use query::ResilientQueryClient;
pub use tasks::spawn_cleanup_task;

//! API Module
//!
//! HTTP handlers and routing for the administrative surface.
//!
//! # Endpoints
//! - `POST /api/cache/clear` - Flush all tiers or a single tier
//! - `POST /api/cache/invalidate` - Apply a data-change invalidation
//! - `GET /api/cache/stats` - Get cache statistics
//! - `GET /api/health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;

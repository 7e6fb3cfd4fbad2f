//! API Routes
//!
//! Configures the Axum router with the administrative cache endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{clear_handler, health_handler, invalidate_handler, stats_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /api/cache/clear` - Flush all tiers, or one with `?tier=`
/// - `POST /api/cache/invalidate` - Drop entries affected by a data change
/// - `GET /api/cache/stats` - Per-tier cache statistics
/// - `GET /api/health` - Health check with cache and token status
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/cache/clear", post(clear_handler))
        .route("/api/cache/invalidate", post(invalidate_handler))
        .route("/api/cache/stats", get(stats_handler))
        .route("/api/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! API Handlers
//!
//! HTTP request handlers for the administrative cache endpoints.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Query, State},
    Json,
};
use tracing::info;

use crate::auth::{CredentialStore, HttpAuthenticator};
use crate::cache::TieredCache;
use crate::config::Config;
use crate::error::{ApiError, QueryError, Result};
use crate::gateway::ReportGateway;
use crate::models::{
    ClearParams, FlushResponse, HealthResponse, InvalidateRequest, InvalidateResponse,
    StatsResponse,
};
use crate::query::{HttpQueryExecutor, ResilientQueryClient};

/// Application state shared across all handlers.
///
/// Report route handlers reach the cache and the upstream through `gateway`.
#[derive(Clone)]
pub struct AppState {
    pub gateway: ReportGateway,
    /// Hide upstream error details from clients
    pub production: bool,
}

impl AppState {
    pub fn new(gateway: ReportGateway, production: bool) -> Self {
        Self {
            gateway,
            production,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the HTTP authenticator and SQL executor for the configured
    /// upstream, and the tiered cache with its per-tier limits.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let authenticator = HttpAuthenticator::new(
            config.auth_url.clone(),
            config.credentials.clone(),
            config.auth_timeout(),
        )
        .context("failed to build authentication client")?;

        let executor = HttpQueryExecutor::new(
            config.sql_url.clone(),
            config.query_timeout(),
            config.max_fetch_rows,
        )
        .context("failed to build query client")?;

        let credentials = CredentialStore::new(
            Arc::new(authenticator),
            config.token_ttl(),
            config.token_safety_margin(),
        );
        let client = ResilientQueryClient::new(credentials, Arc::new(executor));
        let cache = Arc::new(TieredCache::from_config(config));

        Ok(Self::new(
            ReportGateway::new(cache, client),
            config.is_production(),
        ))
    }

    pub fn cache(&self) -> &Arc<TieredCache> {
        self.gateway.cache()
    }

    pub fn credentials(&self) -> &CredentialStore {
        self.gateway.client().credentials()
    }

    /// Wraps a query failure for the client, honouring the environment.
    pub fn query_error(&self, source: QueryError) -> ApiError {
        ApiError::query(source, self.production)
    }
}

/// Handler for POST /api/cache/clear
///
/// Flushes one tier when `?tier=` is given. Without it every tier is flushed
/// and the held access token is discarded.
pub async fn clear_handler(
    State(state): State<AppState>,
    Query(params): Query<ClearParams>,
) -> Result<Json<FlushResponse>> {
    let tier = params.tier().map_err(ApiError::InvalidRequest)?;

    let removed = state.cache().flush(tier).await;
    if tier.is_none() {
        state.credentials().invalidate();
        info!("Access token discarded with full cache clear");
    }

    Ok(Json(FlushResponse::new(removed)))
}

/// Handler for POST /api/cache/invalidate
///
/// Drops every cached entry affected by a data-change event.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let removed = state.cache().invalidate(&req.reason).await;

    Ok(Json(InvalidateResponse::new(req.reason.label(), removed)))
}

/// Handler for GET /api/cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.cache().stats().await.into())
}

/// Handler for GET /api/health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache = state.cache().stats().await.into();
    Json(HealthResponse::healthy(cache, state.credentials().status()))
}

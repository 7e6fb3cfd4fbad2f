//! Report Gateway
//!
//! The cache-aside path every report endpoint follows: look the key up in its
//! tier, and on a miss run the query through the resilient client and store
//! the result. Failures are returned to the caller and never cached.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheKey, CacheTier, Payload, TieredCache};
use crate::error::QueryError;
use crate::query::{ResilientQueryClient, Rows};

// == Report Gateway ==
#[derive(Clone)]
pub struct ReportGateway {
    cache: Arc<TieredCache>,
    client: ResilientQueryClient,
}

impl ReportGateway {
    pub fn new(cache: Arc<TieredCache>, client: ResilientQueryClient) -> Self {
        Self { cache, client }
    }

    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    pub fn client(&self) -> &ResilientQueryClient {
        &self.client
    }

    // == Fetch ==
    /// Returns the cached rows for `key`, running `query` on a miss.
    pub async fn fetch(&self, tier: CacheTier, key: &CacheKey, query: &str) -> Result<Payload, QueryError> {
        self.fetch_shaped(tier, key, query, Value::Array).await
    }

    /// Like [`fetch`](Self::fetch), but caches `shape(rows)` instead of the
    /// raw rows, for endpoints that post-process before responding.
    pub async fn fetch_shaped<F>(
        &self,
        tier: CacheTier,
        key: &CacheKey,
        query: &str,
        shape: F,
    ) -> Result<Payload, QueryError>
    where
        F: FnOnce(Rows) -> Value,
    {
        self.cache
            .get_or_try_insert_with(tier, key.as_str(), None, || async {
                debug!(%tier, key = %key, "cache miss, querying upstream");
                let rows = self.client.run(query).await?;
                Ok::<_, QueryError>(Arc::new(shape(rows)))
            })
            .await
    }
}

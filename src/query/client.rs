//! Resilient Query Client Module
//!
//! Composes the credential store and the executor, recovering from an
//! expired token by refreshing it and retrying exactly once.
//!
//! ```text
//! Start -> FetchToken -> Execute -> Success
//!                           |
//!                      Unauthorized
//!                           v
//!          InvalidateToken -> FetchToken -> Execute -> Success
//!                                              |
//!                                  Unauthorized -> AuthenticationFailed
//! ```
//!
//! Timeouts and other remote failures are surfaced immediately: re-running
//! an expensive analytical query is a decision for the caller.

use std::sync::Arc;

use tracing::{error, warn};

use crate::auth::CredentialStore;
use crate::error::QueryError;
use crate::query::{QueryExecutor, Rows};

/// Which pass of the fetch-token/execute sequence is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    AfterRefresh,
}

// == Resilient Query Client ==
#[derive(Clone)]
pub struct ResilientQueryClient {
    credentials: CredentialStore,
    executor: Arc<dyn QueryExecutor>,
}

impl ResilientQueryClient {
    pub fn new(credentials: CredentialStore, executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            credentials,
            executor,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    // == Run ==
    /// Executes `query` and returns its rows.
    ///
    /// Dropping the returned future cancels the in-flight remote call.
    pub async fn run(&self, query: &str) -> Result<Rows, QueryError> {
        let mut attempt = Attempt::First;

        loop {
            let token = self.credentials.get_token().await?;

            match self.executor.execute(query, &token).await {
                Ok(rows) => return Ok(rows),
                Err(QueryError::Unauthorized) if attempt == Attempt::First => {
                    warn!("Access token rejected, refreshing and retrying once");
                    self.credentials.invalidate_if_current(&token);
                    attempt = Attempt::AfterRefresh;
                }
                Err(QueryError::Unauthorized) => {
                    error!("Freshly issued access token was rejected");
                    return Err(QueryError::AuthenticationFailed(
                        "upstream rejected a freshly issued token".to_string(),
                    ));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

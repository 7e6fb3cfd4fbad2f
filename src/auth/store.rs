//! Credential Store Module
//!
//! Holds the single process-wide bearer token and refreshes it on demand.
//!
//! Refreshes are coalesced: the first caller that finds no valid token starts
//! one login call in a spawned task, and every caller arriving while it is in
//! flight awaits the same shared result. Because the login runs in its own
//! task, a caller that gives up (its request was cancelled) does not cancel
//! the refresh the others are waiting on.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::auth::{Authenticator, Token};
use crate::error::QueryError;

type SharedRefresh = Shared<BoxFuture<'static, Result<Token, QueryError>>>;

// == Token Status ==
/// Snapshot of the held token, for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct TokenStatus {
    pub held: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub refresh_in_flight: bool,
}

#[derive(Default)]
struct State {
    token: Option<Token>,
    refresh: Option<SharedRefresh>,
    /// Bumped each time a refresh is started
    generation: u64,
}

struct Inner {
    authenticator: Arc<dyn Authenticator>,
    /// Local lifetime given to every token
    ttl: Duration,
    /// Subtracted from an advertised lifetime before comparing with `ttl`
    safety_margin: Duration,
    state: Mutex<State>,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lifetime(&self, advertised: Option<Duration>) -> Duration {
        match advertised {
            Some(advertised) => self.ttl.min(advertised.saturating_sub(self.safety_margin)),
            None => self.ttl,
        }
    }

    /// Drops the in-flight refresh, unless a newer one has replaced it.
    fn clear_refresh(&self, generation: u64) {
        let mut state = self.lock_state();
        if state.generation == generation {
            state.refresh = None;
        }
    }

    async fn refresh(&self) -> Result<Token, QueryError> {
        info!("Requesting new access token");
        let result = self
            .authenticator
            .authenticate()
            .await
            .map(|issued| Token::new(issued.access_token, self.lifetime(issued.expires_in)));

        let mut state = self.lock_state();
        state.refresh = None;
        match &result {
            Ok(token) => {
                info!("Access token obtained, valid until {}", token.expires_at());
                state.token = Some(token.clone());
            }
            Err(e) => warn!("Access token refresh failed: {}", e),
        }
        result
    }
}

// == Credential Store ==
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<Inner>,
}

impl CredentialStore {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `authenticator` - Performs the outbound login call
    /// * `ttl` - Local token lifetime, chosen shorter than the upstream's
    /// * `safety_margin` - Trimmed from an advertised `expires_in`
    pub fn new(authenticator: Arc<dyn Authenticator>, ttl: Duration, safety_margin: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                authenticator,
                ttl,
                safety_margin,
                state: Mutex::new(State::default()),
            }),
        }
    }

    // == Get Token ==
    /// Returns the held token if still valid, otherwise refreshes it.
    ///
    /// Never retries a failed login; that policy belongs to the caller.
    pub async fn get_token(&self) -> Result<Token, QueryError> {
        let refresh = {
            let mut state = self.inner.lock_state();
            if let Some(token) = state.token.as_ref().filter(|token| !token.is_expired()) {
                debug!("Reusing cached access token");
                return Ok(token.clone());
            }

            match state.refresh.clone() {
                Some(in_flight) => in_flight,
                None => {
                    state.generation += 1;
                    let refresh = self.spawn_refresh(state.generation);
                    state.refresh = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    fn spawn_refresh(&self, generation: u64) -> SharedRefresh {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            match AssertUnwindSafe(inner.refresh()).catch_unwind().await {
                Ok(result) => result,
                Err(_) => {
                    // A panicking login must not leave the slot occupied
                    inner.clear_refresh(generation);
                    error!("Access token refresh panicked");
                    Err(QueryError::AuthenticationFailed(
                        "token refresh task panicked".to_string(),
                    ))
                }
            }
        });

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        async move {
            task.await.unwrap_or_else(|e| {
                if let Some(inner) = inner.upgrade() {
                    inner.clear_refresh(generation);
                }
                Err(QueryError::AuthenticationFailed(format!(
                    "token refresh task failed: {}",
                    e
                )))
            })
        }
        .boxed()
        .shared()
    }

    // == Invalidate ==
    /// Discards the held token. Idempotent.
    pub fn invalidate(&self) {
        if self.inner.lock_state().token.take().is_some() {
            debug!("Access token discarded");
        }
    }

    /// Discards the held token only if it is `rejected`.
    ///
    /// A concurrent caller may already have replaced a rejected token with a
    /// fresh one; that replacement is kept.
    pub fn invalidate_if_current(&self, rejected: &Token) {
        let mut state = self.inner.lock_state();
        if state.token.as_ref() == Some(rejected) {
            state.token = None;
            debug!("Rejected access token discarded");
        }
    }

    pub fn status(&self) -> TokenStatus {
        let state = self.inner.lock_state();
        let live = state.token.as_ref().filter(|token| !token.is_expired());
        TokenStatus {
            held: live.is_some(),
            expires_at: live.map(Token::expires_at),
            refresh_in_flight: state.refresh.is_some(),
        }
    }

    /// Replaces the held token directly.
    #[cfg(test)]
    pub(crate) fn store(&self, token: Token) {
        self.inner.lock_state().token = Some(token);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IssuedToken;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Issues `token-<n>` after an optional delay, counting calls.
    struct CountingAuthenticator {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
        expires_in: Option<Duration>,
    }

    impl CountingAuthenticator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail: false,
                expires_in: None,
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                fail: false,
                expires_in: None,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authenticator for CountingAuthenticator {
        async fn authenticate(&self) -> Result<IssuedToken, QueryError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(QueryError::AuthenticationFailed("bad credentials".into()));
            }
            Ok(IssuedToken {
                access_token: format!("token-{}", n),
                expires_in: self.expires_in,
            })
        }
    }

    /// Panics on the first login, then issues `token-<n>`.
    struct PanicOnceAuthenticator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Authenticator for PanicOnceAuthenticator {
        async fn authenticate(&self) -> Result<IssuedToken, QueryError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 1 {
                panic!("login handler crashed");
            }
            Ok(IssuedToken {
                access_token: format!("token-{}", n),
                expires_in: None,
            })
        }
    }

    fn store_with(auth: Arc<CountingAuthenticator>) -> CredentialStore {
        CredentialStore::new(auth, Duration::from_secs(3000), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_valid_token_is_reused() {
        let auth = CountingAuthenticator::new();
        let store = store_with(auth.clone());

        let first = store.get_token().await.unwrap();
        let second = store.get_token().await.unwrap();

        assert_eq!(first.value(), "token-1");
        assert_eq!(first, second);
        assert_eq!(auth.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let auth = CountingAuthenticator::new();
        let store = store_with(auth.clone());
        let past = Utc::now() - chrono::Duration::minutes(5);
        store.store(Token::with_expiry("stale", past, past));

        let token = store.get_token().await.unwrap();

        assert_eq!(token.value(), "token-1");
        assert_eq!(auth.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let auth = CountingAuthenticator::new();
        let store = store_with(auth.clone());

        store.get_token().await.unwrap();
        store.invalidate();
        store.invalidate();
        let token = store.get_token().await.unwrap();

        assert_eq!(token.value(), "token-2");
        assert_eq!(auth.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_if_current_keeps_newer_token() {
        let auth = CountingAuthenticator::new();
        let store = store_with(auth.clone());

        let old = store.get_token().await.unwrap();
        store.invalidate();
        let fresh = store.get_token().await.unwrap();

        store.invalidate_if_current(&old);
        assert_eq!(store.get_token().await.unwrap(), fresh);

        store.invalidate_if_current(&fresh);
        assert!(!store.status().held);
    }

    #[tokio::test]
    async fn test_authentication_failure_is_not_retried() {
        let auth = Arc::new(CountingAuthenticator {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: true,
            expires_in: None,
        });
        let store = store_with(auth.clone());

        let result = store.get_token().await;

        assert!(matches!(result, Err(QueryError::AuthenticationFailed(_))));
        assert_eq!(auth.calls(), 1);
        assert!(!store.status().held);
    }

    #[tokio::test]
    async fn test_advertised_lifetime_shortens_ttl() {
        let auth = Arc::new(CountingAuthenticator {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: false,
            expires_in: Some(Duration::from_secs(600)),
        });
        let store = store_with(auth);

        let token = store.get_token().await.unwrap();
        let lifetime = (token.expires_at() - token.issued_at()).num_seconds();

        assert_eq!(lifetime, 540);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refreshes_are_coalesced() {
        let auth = CountingAuthenticator::slow(Duration::from_millis(100));
        let store = store_with(auth.clone());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.get_token().await })
            })
            .collect();

        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert_eq!(token.value(), "token-1");
        }
        assert_eq!(auth.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_caller_does_not_cancel_refresh() {
        let auth = CountingAuthenticator::slow(Duration::from_millis(100));
        let store = store_with(auth.clone());

        let impatient = {
            let store = store.clone();
            tokio::spawn(async move { store.get_token().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        impatient.abort();

        let token = store.get_token().await.unwrap();

        assert_eq!(token.value(), "token-1");
        assert_eq!(auth.calls(), 1);
        assert!(store.status().held);
        assert!(!store.status().refresh_in_flight);
    }

    #[tokio::test]
    async fn test_panicked_refresh_does_not_wedge_store() {
        let auth = Arc::new(PanicOnceAuthenticator {
            calls: AtomicUsize::new(0),
        });
        let store = CredentialStore::new(auth.clone(), Duration::from_secs(3000), Duration::ZERO);

        let first = store.get_token().await;
        assert!(matches!(first, Err(QueryError::AuthenticationFailed(_))));
        assert!(!store.status().refresh_in_flight);

        let second = store.get_token().await.unwrap();
        assert_eq!(second.value(), "token-2");
        assert_eq!(auth.calls.load(Ordering::SeqCst), 2);
        assert!(store.status().held);
    }
}

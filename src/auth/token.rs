//! Access Token Module

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

// == Token ==
/// A bearer token with the local expiry assigned when it was stored.
///
/// Tokens are replaced wholesale on refresh and never mutated in place.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Token {
    /// Creates a token issued now and valid for `ttl`.
    pub fn new(value: impl Into<String>, ttl: Duration) -> Self {
        let issued_at = Utc::now();
        let lifetime = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::weeks(52));
        Self::with_expiry(value, issued_at, issued_at + lifetime)
    }

    pub fn with_expiry(
        value: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            value: value.into(),
            issued_at,
            expires_at,
        }
    }

    /// The raw bearer value.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

// Keeps bearer values out of logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

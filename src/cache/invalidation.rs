//! Invalidation Router Module
//!
//! Maps semantic data-change events onto the cache keys they affect.
//!
//! Keys are canonical `endpoint?name=value&...` strings (see
//! [`CacheKey`](crate::cache::CacheKey)), so matching is plain substring
//! search over keys. This may over-invalidate; it never needs an index of
//! which keys depend on which filter values.

use serde::Deserialize;

use crate::cache::key::encode_pair;

// == Invalidation Reason ==
/// Why cached results should be dropped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidationReason {
    /// New source data landed; every tier is flushed.
    FullReset,
    /// A date range was restated; keys mentioning either boundary go.
    RangeChanged { start: String, end: String },
    /// One dimension value changed; keys filtered on `dimension=value` go.
    DimensionChanged { dimension: String, value: String },
}

impl InvalidationReason {
    pub fn range(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::RangeChanged {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn dimension(dimension: impl Into<String>, value: impl Into<String>) -> Self {
        Self::DimensionChanged {
            dimension: dimension.into(),
            value: value.into(),
        }
    }

    /// Short label for logs and stats.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FullReset => "full_reset",
            Self::RangeChanged { .. } => "range_changed",
            Self::DimensionChanged { .. } => "dimension_changed",
        }
    }

    // == Matches ==
    /// Returns true if `key` must be dropped for this event.
    ///
    /// Needles are trimmed and encoded the same way [`CacheKey`] encodes
    /// filter values. Blank range boundaries are ignored: an empty needle
    /// would match every key.
    ///
    /// [`CacheKey`]: crate::cache::CacheKey
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::FullReset => true,
            Self::RangeChanged { start, end } => [start, end]
                .into_iter()
                .map(|boundary| boundary.trim())
                .filter(|boundary| !boundary.is_empty())
                .any(|boundary| key.contains(urlencoding::encode(boundary).as_ref())),
            Self::DimensionChanged { dimension, value } => {
                let dimension = dimension.trim();
                if dimension.is_empty() {
                    return false;
                }
                key.contains(&encode_pair(dimension, value.trim()))
            }
        }
    }
}

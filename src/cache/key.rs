//! Cache Key Module
//!
//! Canonical cache keys built from an endpoint identity and its filter
//! parameters. Parameters are sorted by name so that logically identical
//! requests produce the same key regardless of the order filters arrive in.
//!
//! Names and values are percent-encoded, so a value containing `&` or `=`
//! can never be read back as a different filter set.

use std::collections::BTreeMap;
use std::fmt;

// == Cache Key ==
/// A canonicalized `endpoint?name=value&...` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Starts a key for the given endpoint identity.
    pub fn builder(endpoint: impl Into<String>) -> CacheKeyBuilder {
        CacheKeyBuilder {
            endpoint: endpoint.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

// == Builder ==
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    endpoint: String,
    params: BTreeMap<String, String>,
}

impl CacheKeyBuilder {
    /// Adds a filter parameter. Blank values are dropped, since an absent
    /// filter and an empty one select the same rows.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        let value = value.to_string();
        let value = value.trim();
        if !value.is_empty() {
            self.params.insert(name.into(), value.to_string());
        }
        self
    }

    /// Adds a parameter only when a value is present.
    pub fn param_opt<T: ToString>(self, name: impl Into<String>, value: Option<T>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn build(self) -> CacheKey {
        if self.params.is_empty() {
            return CacheKey(self.endpoint);
        }

        let query = self
            .params
            .iter()
            .map(|(name, value)| encode_pair(name, value))
            .collect::<Vec<_>>()
            .join("&");

        CacheKey(format!("{}?{}", self.endpoint, query))
    }
}

/// Encodes one `name=value` pair the way [`CacheKeyBuilder::build`] does.
pub(crate) fn encode_pair(name: &str, value: &str) -> String {
    format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_without_params() {
        let key = CacheKey::builder("departments").build();
        assert_eq!(key.as_str(), "departments");
    }

    #[test]
    fn test_key_params_are_sorted() {
        let a = CacheKey::builder("summary")
            .param("start", "2024-01-01")
            .param("department", "COMERCIAL")
            .build();
        let b = CacheKey::builder("summary")
            .param("department", "COMERCIAL")
            .param("start", "2024-01-01")
            .build();

        assert_eq!(a, b);
        assert_eq!(a.as_str(), "summary?department=COMERCIAL&start=2024-01-01");
    }

    #[test]
    fn test_blank_and_missing_params_are_dropped() {
        let key = CacheKey::builder("detail")
            .param("department", "  ")
            .param_opt::<&str>("line", None)
            .param("page", 2)
            .build();

        assert_eq!(key.to_string(), "detail?page=2");
    }

    #[test]
    fn test_reserved_characters_cannot_forge_params() {
        let forged = CacheKey::builder("summary")
            .param("department", "X&start=2024-01-01")
            .build();
        let honest = CacheKey::builder("summary")
            .param("department", "X")
            .param("start", "2024-01-01")
            .build();

        assert_ne!(forged, honest);
        assert_eq!(forged.as_str(), "summary?department=X%26start%3D2024-01-01");
    }

    #[test]
    fn test_values_with_spaces_are_encoded() {
        let key = CacheKey::builder("detail")
            .param("department", "GENTE E GESTAO")
            .build();

        assert_eq!(key.as_str(), "detail?department=GENTE%20E%20GESTAO");
    }
}

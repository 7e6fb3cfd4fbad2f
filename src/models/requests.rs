//! Request DTOs for the administrative API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

use crate::cache::{CacheTier, InvalidationReason};

/// Request body for POST /api/cache/invalidate
///
/// The body is the tagged [`InvalidationReason`] itself, e.g.
/// `{"reason":"dimension_changed","dimension":"department","value":"COMERCIAL"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    #[serde(flatten)]
    pub reason: InvalidationReason,
}

impl InvalidateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match &self.reason {
            InvalidationReason::FullReset => None,
            InvalidationReason::RangeChanged { start, end } => {
                if start.trim().is_empty() && end.trim().is_empty() {
                    Some("At least one of start or end must be provided".to_string())
                } else {
                    None
                }
            }
            InvalidationReason::DimensionChanged { dimension, .. } => {
                if dimension.trim().is_empty() {
                    Some("Dimension cannot be empty".to_string())
                } else {
                    None
                }
            }
        }
    }
}

/// Query string for POST /api/cache/clear
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearParams {
    /// Flush only this tier; all tiers when absent
    #[serde(default)]
    pub tier: Option<String>,
}

impl ClearParams {
    /// Parses the requested tier, if any.
    pub fn tier(&self) -> Result<Option<CacheTier>, String> {
        self.tier.as_deref().map(str::parse).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_request_deserialize() {
        let json = r#"{"reason":"dimension_changed","dimension":"department","value":"COMERCIAL"}"#;
        let req: InvalidateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            req.reason,
            InvalidationReason::dimension("department", "COMERCIAL")
        );
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_validate_blank_range() {
        let req = InvalidateRequest {
            reason: InvalidationReason::range(" ", ""),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_blank_dimension() {
        let req = InvalidateRequest {
            reason: InvalidationReason::dimension("", "X"),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_clear_params_tier() {
        let params = ClearParams {
            tier: Some("export".to_string()),
        };
        assert_eq!(params.tier().unwrap(), Some(CacheTier::Export));

        assert_eq!(ClearParams::default().tier().unwrap(), None);

        let params = ClearParams {
            tier: Some("monthly".to_string()),
        };
        assert!(params.tier().is_err());
    }

    #[test]
    fn test_unknown_reason_is_rejected() {
        let result = serde_json::from_str::<InvalidateRequest>(r#"{"reason":"everything"}"#);
        assert!(result.is_err());
    }
}

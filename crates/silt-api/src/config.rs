//! API configuration.

use std::time::Duration;

use silt_core::constants::{
    DEFAULT_ITEMS_LIMIT, EXPIRE_FULL_PAGE_SECS, EXPIRE_PARTIAL_PAGE_SECS, EXPIRE_POINT_SECS,
};

use crate::rate_limit::RateLimitRule;

/// Configuration for the HTTP query surface.
///
/// The default item limit is threaded into the handlers from here; there is
/// no process-wide mutable default.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Socket address to bind, e.g. `"127.0.0.1:54320"`.
    pub bind: String,
    /// Network id mixed into envelope signatures.
    pub network_id: String,
    /// Items per page when a request gives no limit.
    pub items_limit: u64,
    /// Cache lifetime for point lookups.
    pub expire_point: Duration,
    /// Cache lifetime for a partial page (the growing tail of a list).
    pub expire_partial: Duration,
    /// Cache lifetime for a full historical page behind an offset cursor.
    pub expire_filled: Duration,
    /// Rate-limit rules per route prefix.
    pub rate_limits: Vec<RateLimitRule>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:54320".to_string(),
            network_id: "silt-main".to_string(),
            items_limit: DEFAULT_ITEMS_LIMIT,
            expire_point: Duration::from_secs(EXPIRE_POINT_SECS),
            expire_partial: Duration::from_secs(EXPIRE_PARTIAL_PAGE_SECS),
            expire_filled: Duration::from_secs(EXPIRE_FULL_PAGE_SECS),
            // Mutating admin paths always carry a rule.
            rate_limits: vec![RateLimitRule {
                prefix: "/builder".to_string(),
                limit: 10,
                window: Duration::from_secs(60),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ApiConfig::default();
        assert_eq!(cfg.items_limit, DEFAULT_ITEMS_LIMIT);
        assert!(cfg.expire_filled > cfg.expire_partial);
        assert!(cfg
            .rate_limits
            .iter()
            .any(|r| r.prefix.starts_with("/builder")));
    }
}

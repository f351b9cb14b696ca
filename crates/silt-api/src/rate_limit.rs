//! Per-prefix sliding-window rate limiting.
//!
//! Each rule covers one route prefix; each client IP gets a queue of
//! request timestamps per rule. On every check the queue is pruned to the
//! window, then the remaining length is compared against the limit.

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;

use crate::error::ApiError;

/// One rate-limit rule, applied to every path under `prefix`.
#[derive(Clone, Debug)]
pub struct RateLimitRule {
    /// Route prefix the rule covers, e.g. `"/builder"`.
    pub prefix: String,
    /// Requests allowed per window.
    pub limit: u32,
    /// Sliding window length.
    pub window: Duration,
}

/// Sliding-window limiter over all configured rules.
pub struct RateLimiter {
    rules: Vec<RateLimitRule>,
    clients: DashMap<(String, IpAddr), VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter with the given rules. Paths not covered by any
    /// rule are unlimited.
    pub fn new(rules: Vec<RateLimitRule>) -> Self {
        Self {
            rules,
            clients: DashMap::new(),
        }
    }

    /// Check whether `ip` may request `path` now, recording the request if
    /// allowed. The first matching rule wins.
    pub fn check(&self, path: &str, ip: IpAddr) -> bool {
        let rule = match self.rules.iter().find(|r| path.starts_with(&r.prefix)) {
            Some(rule) => rule,
            None => return true,
        };

        let mut entry = self
            .clients
            .entry((rule.prefix.clone(), ip))
            .or_default();
        let cutoff = Instant::now() - rule.window;
        while entry.front().is_some_and(|t| *t <= cutoff) {
            entry.pop_front();
        }
        if entry.len() >= rule.limit as usize {
            tracing::debug!(%ip, prefix = %rule.prefix, "rate limit exceeded");
            return false;
        }
        entry.push_back(Instant::now());
        true
    }
}

/// Axum middleware enforcing the limiter.
///
/// Falls back to the unspecified address when the connection address is
/// unavailable, which lumps such clients into one bucket rather than
/// letting them bypass the rules.
pub async fn rate_limit_middleware(
    State(limiter): State<std::sync::Arc<RateLimiter>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    if !limiter.check(request.uri().path(), ip) {
        return ApiError::RateLimited.into_response();
    }
    next.run(request).await
}

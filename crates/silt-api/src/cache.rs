//! Serialized-response cache with per-entry lifetimes.
//!
//! Stores fully rendered HAL bodies under deterministic keys. Lifetimes are
//! policy-driven by the handlers: point lookups live a few seconds, full
//! historical pages live for hours (their content can never change), and
//! partial tail pages live a few seconds since the next block may extend
//! them.

use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;

struct Entry {
    body: Bytes,
    expires_at: Instant,
}

/// Concurrent response cache keyed by canonical query strings.
#[derive(Default)]
pub struct ResponseCache {
    entries: DashMap<String, Entry>,
}

impl ResponseCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a live entry; expired entries are removed on the way out.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => {
                if entry.expires_at > Instant::now() {
                    return Some(entry.body.clone());
                }
                true
            }
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    /// Store a rendered body under `key` for `ttl`.
    pub fn put(&self, key: impl Into<String>, body: Bytes, ttl: Duration) {
        self.entries.insert(
            key.into(),
            Entry {
                body,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Number of stored entries, including not-yet-collected expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deterministic cache key: route path plus normalized query parts.
pub fn cache_key(path: &str, parts: &[&str]) -> String {
    let filtered: Vec<&str> = parts.iter().copied().filter(|p| !p.is_empty()).collect();
    format!("{}-{}", path, filtered.join(","))
}

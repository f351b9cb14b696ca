//! Singleflight grouping of concurrent identical queries.
//!
//! All callers sharing a cache key while an execution is in flight receive
//! that execution's result — value and error alike — without touching the
//! store again. Followers are flagged `shared` so only the leader writes
//! the response cache.

use std::collections::HashMap;
use std::future::Future;

use bytes::Bytes;
use tokio::sync::{broadcast, Mutex};

use crate::error::ApiError;

/// A rendered response body plus whether the page hit the requested limit.
#[derive(Clone, Debug)]
pub struct Rendered {
    /// Serialized HAL body.
    pub body: Bytes,
    /// True when the page size equals the requested limit.
    pub filled: bool,
}

impl Rendered {
    /// A non-paginated rendering; `filled` is irrelevant and false.
    pub fn point(body: Bytes) -> Self {
        Self {
            body,
            filled: false,
        }
    }
}

type Flight = Result<Rendered, ApiError>;

/// Groups concurrent executions by key.
#[derive(Default)]
pub struct Coalescer {
    inflight: Mutex<HashMap<String, broadcast::Sender<Flight>>>,
}

impl Coalescer {
    /// Create an empty coalescer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` for `key`, or wait for the in-flight execution of the same
    /// key. Returns the result and whether it was shared (this caller did
    /// not execute).
    pub async fn run<F, Fut>(&self, key: &str, f: F) -> (Flight, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Flight>,
    {
        let rx = {
            let mut map = self.inflight.lock().await;
            match map.get(key) {
                Some(tx) => Some(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    map.insert(key.to_string(), tx);
                    None
                }
            }
        };

        if let Some(mut rx) = rx {
            return match rx.recv().await {
                Ok(result) => (result, true),
                // The leader died before publishing.
                Err(_) => (
                    Err(ApiError::Internal("coalesced execution dropped".into())),
                    true,
                ),
            };
        }

        let result = f().await;

        // Unregister before publishing so late arrivals start a fresh
        // execution rather than waiting on a finished one.
        let tx = self.inflight.lock().await.remove(key);
        if let Some(tx) = tx {
            let _ = tx.send(result.clone());
        }
        (result, false)
    }
}

//! Route wiring and shared handler plumbing.

pub mod account;
pub mod block;
pub mod node;
pub mod send;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use silt_core::crypto::{NetworkId, PrivateKey};
use silt_core::types::{Height, Manifest};
use silt_digest::{parse_offset, DigestStore};

use crate::cache::ResponseCache;
use crate::coalesce::{Coalescer, Rendered};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::hal::{Hal, HAL_MIMETYPE};
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::send::PeerChannel;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DigestStore>,
    pub cache: Arc<ResponseCache>,
    pub coalescer: Arc<Coalescer>,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<ApiConfig>,
    pub node_key: Arc<PrivateKey>,
    pub network_id: NetworkId,
    pub channels: Arc<Vec<Arc<dyn PeerChannel>>>,
}

impl AppState {
    /// Assemble the state: cache, coalescer, and limiter are built from the
    /// configuration.
    pub fn new(
        store: Arc<DigestStore>,
        config: ApiConfig,
        node_key: PrivateKey,
        channels: Vec<Arc<dyn PeerChannel>>,
    ) -> Self {
        let network_id = NetworkId::new(config.network_id.clone());
        Self {
            store,
            cache: Arc::new(ResponseCache::new()),
            coalescer: Arc::new(Coalescer::new()),
            limiter: Arc::new(RateLimiter::new(config.rate_limits.clone())),
            config: Arc::new(config),
            node_key: Arc::new(node_key),
            network_id,
            channels: Arc::new(channels),
        }
    }
}

/// Build the router: resource routes, rate limiting, CORS.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(node::node_info))
        .route("/currency", get(node::currencies))
        .route("/currency/:currency_id", get(node::currency))
        .route("/block/manifests", get(block::manifests))
        .route("/block/operations", get(block::operations))
        .route("/block/operation/:hash", get(block::operation))
        .route("/block/:height_or_hash", get(block::block_detail))
        .route(
            "/block/:height_or_hash/operations",
            get(block::operations_by_height),
        )
        .route("/account/:address", get(account::account))
        .route("/account/:address/operations", get(account::operations))
        // Reserved; answers with the unsupported problem.
        .route("/document/:address", get(account::document))
        .route("/builder/send", post(send::send))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.limiter),
            rate_limit_middleware,
        ))
        .layer(cors)
        .with_state(state)
}

// --- Shared query plumbing ---

/// Common query parameters of paginated endpoints.
#[derive(Deserialize, Default)]
pub(crate) struct PageQuery {
    pub limit: Option<u64>,
    pub offset: Option<String>,
    pub reverse: Option<String>,
}

impl PageQuery {
    /// The `reverse` flag; `1` and `true` are truthy, everything else is
    /// forward.
    pub(crate) fn reverse(&self) -> bool {
        matches!(self.reverse.as_deref(), Some("1") | Some("true"))
    }

    /// The raw offset string, if present and non-empty.
    pub(crate) fn offset_str(&self) -> Option<&str> {
        self.offset.as_deref().filter(|s| !s.is_empty())
    }
}

/// Parse an optional `"height,index"` cursor; malformed input is a client
/// error.
pub(crate) fn parse_cursor(offset: Option<&str>) -> Result<Option<(Height, u64)>, ApiError> {
    offset
        .map(parse_offset)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Resolve the page size: the explicit request limit when positive, else
/// the configured default; always capped by the store's hard page size.
pub(crate) fn effective_limit(requested: Option<u64>, config: &ApiConfig) -> u64 {
    let limit = match requested {
        Some(l) if l > 0 => l,
        _ => config.items_limit,
    };
    limit.min(silt_core::constants::MAX_PAGE_SIZE)
}

/// Cache lifetime for a rendered page: a full page behind a fixed offset
/// cursor can never change and lives long; everything else is the growing
/// tail and expires quickly.
pub(crate) fn page_ttl(config: &ApiConfig, offset_present: bool, rendered: &Rendered) -> Duration {
    if offset_present && rendered.filled {
        config.expire_filled
    } else {
        config.expire_partial
    }
}

// --- Responses ---

pub(crate) fn hal_response(body: Bytes) -> Response {
    ([(header::CONTENT_TYPE, HAL_MIMETYPE)], body).into_response()
}

pub(crate) fn render<T: Serialize>(hal: &Hal<T>) -> Result<Bytes, ApiError> {
    serde_json::to_vec(hal)
        .map(Bytes::from)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Cache-then-coalesce wrapper shared by every cacheable handler: serve
/// from the cache when possible, otherwise run `f` at most once per key and
/// let the non-shared caller write the cache.
pub(crate) async fn respond_cached<F, Fut>(
    state: &AppState,
    key: String,
    ttl: impl FnOnce(&Rendered) -> Duration,
    f: F,
) -> Response
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Rendered, ApiError>>,
{
    if let Some(body) = state.cache.get(&key) {
        return hal_response(body);
    }

    let (result, shared) = state.coalescer.run(&key, f).await;
    match result {
        Ok(rendered) => {
            if !shared {
                state.cache.put(key, rendered.body.clone(), ttl(&rendered));
            }
            hal_response(rendered.body)
        }
        Err(e) => e.into_response(),
    }
}

// --- JSON views ---

pub(crate) fn rfc3339(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

#[derive(Serialize)]
pub(crate) struct ManifestJson {
    pub height: i64,
    pub hash: String,
    pub previous_hash: String,
    pub operations_hash: String,
    pub states_hash: String,
    pub confirmed_at: String,
}

impl From<&Manifest> for ManifestJson {
    fn from(m: &Manifest) -> Self {
        Self {
            height: m.height.0,
            hash: m.hash.to_string(),
            previous_hash: m.previous_hash.to_string(),
            operations_hash: m.operations_hash.to_string(),
            states_hash: m.states_hash.to_string(),
            confirmed_at: rfc3339(m.confirmed_at),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct AmountJson {
    pub currency: String,
    /// Decimal string; values may exceed what JSON numbers carry safely.
    pub value: String,
}

#[derive(Serialize)]
pub(crate) struct AccountJson {
    pub address: String,
    pub public_key: String,
    pub balances: Vec<AmountJson>,
    pub height: i64,
    pub previous_height: i64,
}

#[derive(Serialize)]
pub(crate) struct OperationJson {
    pub fact_hash: String,
    pub body: serde_json::Value,
    pub height: i64,
    pub confirmed_at: String,
    pub in_state: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub index: u64,
}

impl OperationJson {
    pub(crate) fn try_from(va: &silt_digest::OperationValue) -> Result<Self, ApiError> {
        Ok(Self {
            fact_hash: va.op.fact_hash.to_string(),
            body: serde_json::to_value(&va.op.body)
                .map_err(|e| ApiError::Internal(e.to_string()))?,
            height: va.height.0,
            confirmed_at: rfc3339(va.confirmed_at),
            in_state: va.op.in_state,
            reason: va.op.reason.clone(),
            index: va.index,
        })
    }
}

#[derive(Serialize)]
pub(crate) struct CurrencyJson {
    pub currency: String,
    pub genesis_supply: String,
    pub min_balance: String,
}

impl From<&silt_core::amount::CurrencyDesign> for CurrencyJson {
    fn from(d: &silt_core::amount::CurrencyDesign) -> Self {
        Self {
            currency: d.currency.to_string(),
            genesis_supply: d.genesis_supply.to_string(),
            min_balance: d.min_balance.to_string(),
        }
    }
}

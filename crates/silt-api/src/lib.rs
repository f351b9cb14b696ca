//! # silt-api — HTTP query surface for the Silt index.
//!
//! Serves hypermedia (HAL) JSON over the derived store:
//! - [`routes`] — axum router and per-resource handlers
//! - [`cache`] — serialized-response cache with policy-driven lifetimes
//! - [`coalesce`] — singleflight grouping of concurrent identical queries
//! - [`rate_limit`] — per-prefix sliding-window rate limiting
//! - [`send`] — envelope signing and distribution to peer channels

pub mod cache;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod hal;
pub mod rate_limit;
pub mod routes;
pub mod send;

pub use cache::ResponseCache;
pub use coalesce::{Coalescer, Rendered};
pub use config::ApiConfig;
pub use error::{ApiError, Problem};
pub use rate_limit::{RateLimitRule, RateLimiter};
pub use routes::{router, AppState};
pub use send::{distribute, HttpChannel, PeerChannel};

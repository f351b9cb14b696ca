//! Node info and currency handlers.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use silt_core::amount::CurrencyId;

use crate::cache::cache_key;
use crate::coalesce::Rendered;
use crate::error::ApiError;
use crate::hal::{Hal, HalLink};

use super::{render, respond_cached, AppState, CurrencyJson, ManifestJson};

#[derive(Serialize)]
struct NodeInfoJson {
    version: String,
    network_id: String,
    last_block: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest: Option<ManifestJson>,
}

/// GET `/` — node info with the tip manifest.
pub(crate) async fn node_info(State(state): State<AppState>) -> Response {
    let key = cache_key("/", &[]);
    let ttl = state.config.expire_point;
    let st = state.clone();

    respond_cached(&state, key, move |_| ttl, move || async move {
        let last = st.store.last_block();
        let manifest = if last.is_nil() {
            None
        } else {
            st.store.manifest_by_height(last).map_err(ApiError::from)?
        };

        let info = NodeInfoJson {
            version: env!("CARGO_PKG_VERSION").to_string(),
            network_id: st.config.network_id.clone(),
            last_block: last.0,
            manifest: manifest.as_ref().map(ManifestJson::from),
        };
        let hal = Hal::new(info, "/")
            .add_link(
                "currency:{currencyid}",
                HalLink::templated("/currency/{currencyid}"),
            )
            .add_link("manifests", HalLink::new("/block/manifests"))
            .add_link("operations", HalLink::new("/block/operations"));
        Ok(Rendered::point(render(&hal)?))
    })
    .await
}

/// GET `/currency` — registered currency ids and designs.
pub(crate) async fn currencies(State(state): State<AppState>) -> Response {
    let key = cache_key("/currency", &[]);
    let ttl = state.config.expire_point;
    let st = state.clone();

    respond_cached(&state, key, move |_| ttl, move || async move {
        let designs = st.store.currencies().map_err(ApiError::from)?;
        let items: Vec<Hal<CurrencyJson>> = designs
            .iter()
            .map(|d| {
                Hal::new(
                    CurrencyJson::from(d),
                    format!("/currency/{}", d.currency),
                )
            })
            .collect();
        let hal = Hal::new(items, "/currency");
        Ok(Rendered::point(render(&hal)?))
    })
    .await
}

/// GET `/currency/{currency_id}` — one currency design.
pub(crate) async fn currency(
    State(state): State<AppState>,
    Path(currency_id): Path<String>,
) -> Response {
    let cid = match CurrencyId::from_str(currency_id.trim()) {
        Ok(cid) => cid,
        Err(e) => return ApiError::BadRequest(e.to_string()).into_response(),
    };

    let path = format!("/currency/{cid}");
    let key = cache_key(&path, &[]);
    let ttl = state.config.expire_point;
    let st = state.clone();

    respond_cached(&state, key, move |_| ttl, move || async move {
        let design = st
            .store
            .currency(&cid)
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::NotFound(format!("currency, {cid}")))?;
        let hal = Hal::new(CurrencyJson::from(&design), format!("/currency/{cid}"))
            .add_link("currencies", HalLink::new("/currency"));
        Ok(Rendered::point(render(&hal)?))
    })
    .await
}

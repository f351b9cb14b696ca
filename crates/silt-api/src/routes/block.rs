//! Manifest and operation handlers.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};

use silt_core::types::{Hash256, Height};
use silt_digest::{build_offset, OperationsFilter};

use crate::cache::cache_key;
use crate::coalesce::Rendered;
use crate::error::ApiError;
use crate::hal::{add_query, Hal, HalLink};

use super::{
    effective_limit, page_ttl, parse_cursor, render, respond_cached, AppState, ManifestJson,
    OperationJson, PageQuery,
};

const PATH_MANIFESTS: &str = "/block/manifests";
const PATH_OPERATIONS: &str = "/block/operations";

/// GET `/block/manifests` — paginated manifests; `offset` is a plain
/// height, the cursor being one-dimensional here.
pub(crate) async fn manifests(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Response {
    let offset = match q.offset_str() {
        None => None,
        Some(s) => match s.parse::<i64>() {
            Ok(h) if h >= 0 => Some(Height(h)),
            _ => {
                return ApiError::BadRequest(format!("invalid height offset: {s:?}"))
                    .into_response()
            }
        },
    };
    let reverse = q.reverse();
    let limit = effective_limit(q.limit, &state.config);

    let offset_part = q
        .offset_str()
        .map(|s| format!("offset={s}"))
        .unwrap_or_default();
    let reverse_part = if reverse { "reverse=1" } else { "" };
    let key = cache_key(PATH_MANIFESTS, &[&offset_part, reverse_part]);

    let offset_present = offset.is_some();
    let cfg = state.config.clone();
    let st = state.clone();

    respond_cached(
        &state,
        key,
        move |r| page_ttl(&cfg, offset_present, r),
        move || async move {
            let mut items: Vec<Hal<ManifestJson>> = Vec::new();
            let mut next_height = Height::NIL;
            st.store
                .manifests(true, reverse, offset, limit, &mut |height, _, manifest| {
                    if let Some(m) = manifest {
                        next_height = height;
                        items.push(
                            Hal::new(ManifestJson::from(&m), format!("/block/{height}"))
                                .add_link(
                                    "operations",
                                    HalLink::new(format!("/block/{height}/operations")),
                                ),
                        );
                    }
                    Ok(true)
                })
                .map_err(ApiError::from)?;
            if items.is_empty() {
                return Err(ApiError::NotFound("manifests".into()));
            }

            let filled = items.len() as u64 == limit;

            let mut self_href = PATH_MANIFESTS.to_string();
            if let Some(h) = offset {
                self_href = add_query(&self_href, &format!("offset={h}"));
            }
            if reverse {
                self_href = add_query(&self_href, "reverse=1");
            }

            let mut hal = Hal::new(items, self_href);
            if filled && !next_height.is_nil() {
                let mut next = add_query(PATH_MANIFESTS, &format!("offset={next_height}"));
                if reverse {
                    next = add_query(&next, "reverse=1");
                }
                hal = hal.add_link("next", HalLink::new(next));
            }
            let rev = add_query(
                PATH_MANIFESTS,
                if reverse { "reverse=0" } else { "reverse=1" },
            );
            hal = hal.add_link("reverse", HalLink::new(rev));

            Ok(Rendered {
                body: render(&hal)?,
                filled,
            })
        },
    )
    .await
}

/// GET `/block/{height_or_hash}` — manifest by height (numeric) or hash.
pub(crate) async fn block_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let id = id.trim().to_string();
    let path = format!("/block/{id}");
    let key = cache_key(&path, &[]);
    let ttl = state.config.expire_point;
    let st = state.clone();

    respond_cached(&state, key, move |_| ttl, move || async move {
        let manifest = if let Ok(height) = id.parse::<i64>() {
            if height < 0 {
                return Err(ApiError::BadRequest(format!("invalid height: {height}")));
            }
            st.store
                .manifest_by_height(Height(height))
                .map_err(ApiError::from)?
        } else if let Some(hash) = Hash256::from_hex(&id) {
            st.store.manifest(&hash).map_err(ApiError::from)?
        } else {
            return Err(ApiError::BadRequest(format!("invalid block id: {id:?}")));
        };

        let manifest = manifest.ok_or_else(|| ApiError::NotFound(format!("block, {id}")))?;
        let height = manifest.height;
        let mut hal = Hal::new(ManifestJson::from(&manifest), format!("/block/{height}"))
            .add_link(
                "operations",
                HalLink::new(format!("/block/{height}/operations")),
            )
            .add_link("manifests", HalLink::new(PATH_MANIFESTS));
        if !manifest.previous_hash.is_zero() {
            hal = hal.add_link(
                "previous_block",
                HalLink::new(format!("/block/{}", manifest.previous_hash)),
            );
        }
        Ok(Rendered::point(render(&hal)?))
    })
    .await
}

/// GET `/block/operations` — global operation listing with cursor
/// pagination.
pub(crate) async fn operations(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Response {
    let offset = match parse_cursor(q.offset_str()) {
        Ok(offset) => offset,
        Err(e) => return e.into_response(),
    };
    let reverse = q.reverse();
    let limit = effective_limit(q.limit, &state.config);

    let offset_part = q
        .offset_str()
        .map(|s| format!("offset={s}"))
        .unwrap_or_default();
    let reverse_part = if reverse { "reverse=1" } else { "" };
    let key = cache_key(PATH_OPERATIONS, &[&offset_part, reverse_part]);

    let offset_present = offset.is_some();
    let cfg = state.config.clone();
    let st = state.clone();

    respond_cached(
        &state,
        key,
        move |r| page_ttl(&cfg, offset_present, r),
        move || async move {
            let mut records = Vec::new();
            st.store
                .operations(
                    OperationsFilter::All { offset },
                    true,
                    reverse,
                    limit,
                    |_, va| {
                        if let Some(va) = va {
                            records.push(va);
                        }
                        Ok(true)
                    },
                )
                .map_err(ApiError::from)?;
            if records.is_empty() {
                return Err(ApiError::NotFound("operations".into()));
            }
            let next_cursor = records.last().map(|va| va.cursor());
            let items = records
                .iter()
                .map(OperationJson::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            let filled = items.len() as u64 == limit;

            let mut self_href = PATH_OPERATIONS.to_string();
            if let Some(s) = q.offset_str() {
                self_href = add_query(&self_href, &format!("offset={s}"));
            }
            if reverse {
                self_href = add_query(&self_href, "reverse=1");
            }

            let mut hal = Hal::new(items, self_href);
            if filled {
                if let Some((h, i)) = next_cursor {
                    let mut next =
                        add_query(PATH_OPERATIONS, &format!("offset={}", build_offset(h, i)));
                    if reverse {
                        next = add_query(&next, "reverse=1");
                    }
                    hal = hal.add_link("next", HalLink::new(next));
                }
            }
            let rev = add_query(
                PATH_OPERATIONS,
                if reverse { "reverse=0" } else { "reverse=1" },
            );
            hal = hal.add_link("reverse", HalLink::new(rev));

            Ok(Rendered {
                body: render(&hal)?,
                filled,
            })
        },
    )
    .await
}

/// GET `/block/operation/{hash}` — operation by fact hash.
pub(crate) async fn operation(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Response {
    let fact_hash = match Hash256::from_hex(hash.trim()) {
        Some(h) => h,
        None => {
            return ApiError::BadRequest(format!("invalid fact hash: {hash:?}")).into_response()
        }
    };

    let path = format!("/block/operation/{fact_hash}");
    let key = cache_key(&path, &[]);
    let ttl = state.config.expire_point;
    let st = state.clone();

    respond_cached(&state, key, move |_| ttl, move || async move {
        let va = st
            .store
            .operation(&fact_hash)
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::NotFound(format!("operation, {fact_hash}")))?;
        let height = va.height;
        let hal = Hal::new(
            OperationJson::try_from(&va)?,
            format!("/block/operation/{fact_hash}"),
        )
        .add_link("block", HalLink::new(format!("/block/{height}")));
        Ok(Rendered::point(render(&hal)?))
    })
    .await
}

/// GET `/block/{height}/operations` — operations confirmed at one height.
pub(crate) async fn operations_by_height(
    State(state): State<AppState>,
    Path(height): Path<i64>,
    Query(q): Query<PageQuery>,
) -> Response {
    if height < 0 {
        return ApiError::BadRequest(format!("invalid height: {height}")).into_response();
    }
    let reverse = q.reverse();
    let limit = effective_limit(q.limit, &state.config);

    let path = format!("/block/{height}/operations");
    let reverse_part = if reverse { "reverse=1" } else { "" };
    let key = cache_key(&path, &[reverse_part]);

    let cfg = state.config.clone();
    let st = state.clone();

    respond_cached(
        &state,
        key,
        // A finalized height's operation set is fixed, so a full page is
        // safe to keep around.
        move |r| page_ttl(&cfg, true, r),
        move || async move {
            let mut records = Vec::new();
            st.store
                .operations(
                    OperationsFilter::ByHeight(Height(height)),
                    true,
                    reverse,
                    limit,
                    |_, va| {
                        if let Some(va) = va {
                            records.push(va);
                        }
                        Ok(true)
                    },
                )
                .map_err(ApiError::from)?;
            if records.is_empty() {
                return Err(ApiError::NotFound(format!("operations at {height}")));
            }
            let items = records
                .iter()
                .map(OperationJson::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            let filled = items.len() as u64 == limit;

            let mut self_href = format!("/block/{height}/operations");
            if reverse {
                self_href = add_query(&self_href, "reverse=1");
            }
            let hal = Hal::new(items, self_href)
                .add_link("block", HalLink::new(format!("/block/{height}")));
            Ok(Rendered {
                body: render(&hal)?,
                filled,
            })
        },
    )
    .await
}

//! Account and document handlers.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};

use silt_core::address::Address;
use silt_digest::build_offset;

use crate::cache::cache_key;
use crate::coalesce::Rendered;
use crate::error::ApiError;
use crate::hal::{add_query, Hal, HalLink};

use super::{
    effective_limit, page_ttl, parse_cursor, render, respond_cached, AccountJson, AmountJson,
    AppState, OperationJson, PageQuery,
};

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    Address::from_str(raw.trim()).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// GET `/account/{address}` — account with its latest balances.
pub(crate) async fn account(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Response {
    let address = match parse_address(&address) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };

    let path = format!("/account/{address}");
    let key = cache_key(&path, &[]);
    let ttl = state.config.expire_point;
    let st = state.clone();

    respond_cached(&state, key, move |_| ttl, move || async move {
        let va = st
            .store
            .account(&address)
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::NotFound(format!("account, {address}")))?;

        let json = AccountJson {
            address: va.address.to_string(),
            public_key: va.public_key.clone(),
            balances: va
                .balances
                .iter()
                .map(|am| AmountJson {
                    currency: am.currency.to_string(),
                    value: am.value.to_string(),
                })
                .collect(),
            height: va.height.0,
            previous_height: va.previous_height.0,
        };

        let ops_href = format!("/account/{address}/operations");
        let mut hal = Hal::new(json, format!("/account/{address}"))
            .add_link(
                "currency:{currencyid}",
                HalLink::templated("/currency/{currencyid}"),
            )
            .add_link("operations", HalLink::new(ops_href.clone()))
            .add_link(
                "operations:{offset}",
                HalLink::templated(format!("{ops_href}?offset={{offset}}")),
            )
            .add_link(
                "operations:{offset,reverse}",
                HalLink::templated(format!("{ops_href}?offset={{offset}}&reverse=1")),
            );

        if !va.height.is_nil() {
            hal = hal.add_link("block", HalLink::new(format!("/block/{}", va.height)));
        }
        if !va.previous_height.is_nil() {
            hal = hal.add_link(
                "previous_block",
                HalLink::new(format!("/block/{}", va.previous_height)),
            );
        }
        Ok(Rendered::point(render(&hal)?))
    })
    .await
}

/// GET `/account/{address}/operations` — paginated operations touching the
/// address.
pub(crate) async fn operations(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(q): Query<PageQuery>,
) -> Response {
    let address = match parse_address(&address) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };
    let offset = match parse_cursor(q.offset_str()) {
        Ok(offset) => offset,
        Err(e) => return e.into_response(),
    };
    let reverse = q.reverse();
    let limit = effective_limit(q.limit, &state.config);

    let path = format!("/account/{address}/operations");
    let offset_part = q
        .offset_str()
        .map(|s| format!("offset={s}"))
        .unwrap_or_default();
    let reverse_part = if reverse { "reverse=1" } else { "" };
    let key = cache_key(&path, &[&offset_part, reverse_part]);

    let offset_present = offset.is_some();
    let cfg = state.config.clone();
    let st = state.clone();
    let offset_raw = q.offset_str().map(str::to_string);

    respond_cached(
        &state,
        key,
        move |r| page_ttl(&cfg, offset_present, r),
        move || async move {
            let mut records = Vec::new();
            st.store
                .operations_by_address(&address, true, reverse, offset, limit, |_, va| {
                    if let Some(va) = va {
                        records.push(va);
                    }
                    Ok(true)
                })
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

            let base = format!("/account/{address}/operations");
            let mut self_href = base.clone();
            if let Some(s) = &offset_raw {
                self_href = add_query(&self_href, &format!("offset={s}"));
            }
            if reverse {
                self_href = add_query(&self_href, "reverse=1");
            }

            let mut hal = Hal::new(items, self_href)
                .add_link("account", HalLink::new(format!("/account/{address}")));
            if filled {
                if let Some((h, i)) = next_cursor {
                    let mut next = add_query(&base, &format!("offset={}", build_offset(h, i)));
                    if reverse {
                        next = add_query(&next, "reverse=1");
                    }
                    hal = hal.add_link("next", HalLink::new(next));
                }
            }
            let rev = add_query(&base, if reverse { "reverse=0" } else { "reverse=1" });
            hal = hal.add_link("reverse", HalLink::new(rev));

            Ok(Rendered {
                body: render(&hal)?,
                filled,
            })
        },
    )
    .await
}

/// GET `/document/{address}` — reserved; the feature is disabled.
pub(crate) async fn document(State(_state): State<AppState>) -> Response {
    ApiError::Unsupported("document".into()).into_response()
}

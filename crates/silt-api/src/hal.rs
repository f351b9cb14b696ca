//! Hypermedia (HAL) document rendering.

use std::collections::BTreeMap;

use serde::Serialize;

/// Media type for HAL documents.
pub const HAL_MIMETYPE: &str = "application/hal+json; charset=utf-8";

/// One `_links` entry.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct HalLink {
    /// Link target; may be an RFC 6570 template when `templated` is set.
    pub href: String,
    /// Present and `true` for templated links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templated: Option<bool>,
}

impl HalLink {
    /// Plain link.
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            templated: None,
        }
    }

    /// Templated link.
    pub fn templated(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            templated: Some(true),
        }
    }
}

/// A HAL document: an embedded resource plus its `_links`.
///
/// Links render in name order (BTreeMap), which keeps serialized responses
/// byte-stable for the cache.
#[derive(Serialize, Clone, Debug)]
pub struct Hal<T: Serialize> {
    #[serde(rename = "_embedded")]
    embedded: T,
    #[serde(rename = "_links")]
    links: BTreeMap<String, HalLink>,
}

impl<T: Serialize> Hal<T> {
    /// Wrap a resource with its `self` link.
    pub fn new(embedded: T, self_href: impl Into<String>) -> Self {
        let mut links = BTreeMap::new();
        links.insert("self".to_string(), HalLink::new(self_href));
        Self { embedded, links }
    }

    /// Add a named link, replacing an existing one of the same name.
    pub fn add_link(mut self, name: impl Into<String>, link: HalLink) -> Self {
        self.links.insert(name.into(), link);
        self
    }
}

/// Append a query fragment to an URL, using `?` or `&` as appropriate.
pub fn add_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    if url.contains('?') {
        format!("{url}&{query}")
    } else {
        format!("{url}?{query}")
    }
}

//! Cursor-following pagination over PayPal list endpoints.
//!
//! PayPal list responses carry a `links` array; the entry with `rel == "next"`
//! points at the following page. Pagination ends when it is absent.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Url;
use serde_json::Value;
use std::collections::HashSet;

use crate::http::{Exchange, Execute, RequestDescriptor};

/// Collection key of the transaction search response.
pub const TRANSACTION_DETAILS: &str = "transaction_details";
/// Collection key of the invoice list response.
pub const INVOICE_ITEMS: &str = "items";

/// Entries gathered across pages, plus the first exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Pages {
    pub entries: Vec<Value>,
    pub first: Exchange,
}

/// Fetches `request` and, when `return_all` is set, every page after it.
///
/// Follow-on requests reuse the headers of `request`, so the same token is
/// used for the whole walk.
#[tracing::instrument(skip(executor, request), fields(url = %request.url))]
pub async fn fetch_pages<E: Execute + ?Sized>(
    executor: &E,
    request: RequestDescriptor,
    collection_key: &str,
    return_all: bool,
) -> Result<Pages> {
    let first = executor.execute(request.clone()).await?;
    let mut entries = collection(&first.response, collection_key);
    debug!("Page 1: {} {}", entries.len(), collection_key);

    if !return_all {
        return Ok(Pages { entries, first });
    }

    let mut visited = HashSet::from([request.url.clone()]);
    let mut next = next_url(&first.response, &request.url)?;
    let mut page = 1;

    while let Some(url) = next {
        if !visited.insert(url.clone()) {
            warn!("Next link points back at {}, stopping pagination", url);
            break;
        }

        page += 1;
        let exchange = executor.execute(request.with_url(url.as_str())).await?;
        let page_entries = collection(&exchange.response, collection_key);
        debug!("Page {}: {} {}", page, page_entries.len(), collection_key);
        entries.extend(page_entries);

        next = next_url(&exchange.response, &url)?;
    }

    Ok(Pages { entries, first })
}

fn collection(response: &Value, key: &str) -> Vec<Value> {
    response
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// The `href` of the `next` link, resolved against the URL of the page it came from.
fn next_url(response: &Value, current: &str) -> Result<Option<String>> {
    let href = response
        .get("links")
        .and_then(Value::as_array)
        .and_then(|links| {
            links
                .iter()
                .find(|link| link.get("rel").and_then(Value::as_str) == Some("next"))
        })
        .and_then(|link| link.get("href"))
        .and_then(Value::as_str);

    let Some(href) = href else {
        return Ok(None);
    };

    let base = Url::parse(current).with_context(|| format!("Invalid page URL {}", current))?;
    let url = base
        .join(href)
        .with_context(|| format!("Invalid next link {}", href))?;
    Ok(Some(url.to_string()))
}

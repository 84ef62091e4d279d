//! Transaction search (`GET /v1/reporting/transactions`).

use anyhow::Result;
use log::debug;

use super::{OperationContext, clamp_page_size, endpoint_url, page_number};
use crate::error::ConnectorError;
use crate::http::Execute;
use crate::paginate::{Pages, TRANSACTION_DETAILS, fetch_pages};
use crate::params::{ItemParameters, non_empty};
use crate::record::OutputRecord;

pub const TRANSACTIONS_PATH: &str = "/v1/reporting/transactions";

/// Largest page size the transaction search API accepts.
pub const MAX_TRANSACTION_PAGE_SIZE: u32 = 500;
const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_FIELDS: &str = "all";

/// Query string for a transaction search, in the order PayPal documents it.
fn transaction_query(
    params: &ItemParameters,
    item_index: usize,
) -> Result<Vec<(&'static str, String)>> {
    let start_date = non_empty(&params.start_date)
        .ok_or_else(|| ConnectorError::invalid_input("Start date is required", item_index))?;

    let fields = match &params.fields {
        Some(fields) if !fields.is_empty() => fields.join(","),
        _ => DEFAULT_FIELDS.to_string(),
    };

    let page_size = clamp_page_size(
        params.page_size,
        DEFAULT_PAGE_SIZE,
        MAX_TRANSACTION_PAGE_SIZE,
    );

    let mut query = vec![
        ("start_date", utc_timestamp(start_date)),
        ("fields", fields),
        ("page_size", page_size.to_string()),
    ];

    if let Some(end_date) = non_empty(&params.end_date) {
        query.push(("end_date", utc_timestamp(end_date)));
    }
    if let Some(transaction_id) = non_empty(&params.transaction_id) {
        query.push(("transaction_id", transaction_id.to_string()));
    }
    if !params.return_all {
        query.push(("page", page_number(params.page).to_string()));
    }

    Ok(query)
}

/// Timestamps are sent in UTC; a missing `Z` designator is appended.
fn utc_timestamp(value: &str) -> String {
    if value.ends_with('Z') {
        value.to_string()
    } else {
        format!("{}Z", value)
    }
}

/// One record per transaction, or the raw response when the search is empty.
pub async fn get_transactions<E: Execute + ?Sized>(
    ctx: &OperationContext<'_, E>,
    params: &ItemParameters,
    item_index: usize,
) -> Result<Vec<OutputRecord>> {
    let query = transaction_query(params, item_index)?;
    let url = endpoint_url(ctx.api_url, TRANSACTIONS_PATH, &query)?;

    let Pages { entries, first } =
        fetch_pages(ctx.executor, ctx.get(url), TRANSACTION_DETAILS, params.return_all).await?;

    debug!("Fetched {} transaction(s)", entries.len());

    let raw = params.options.include_raw_data.then_some(&first);

    if entries.is_empty() {
        return Ok(vec![OutputRecord::from_payload(first.response.clone(), raw)]);
    }

    Ok(entries
        .into_iter()
        .map(|detail| OutputRecord::from_payload(detail, raw))
        .collect())
}

//! Invoicing v2 operations.

use anyhow::Result;
use log::debug;
use reqwest::Method;
use serde_json::{Map, Value, json};

use super::{
    OperationContext, clamp_page_size, endpoint_url, page_number, resource_url,
};
use crate::error::ConnectorError;
use crate::http::{Execute, RequestDescriptor};
use crate::paginate::{INVOICE_ITEMS, Pages, fetch_pages};
use crate::params::{ItemParameters, decode_json, non_empty};
use crate::record::OutputRecord;

pub const INVOICES_PATH: &str = "/v2/invoicing/invoices";

/// Largest page size the invoice list API accepts.
pub const MAX_INVOICE_PAGE_SIZE: u32 = 100;
const DEFAULT_PAGE_SIZE: u32 = 20;

const INVOICE_SEGMENTS: [&str; 3] = ["v2", "invoicing", "invoices"];

fn invoice_id(params: &ItemParameters, item_index: usize) -> Result<&str> {
    non_empty(&params.invoice_id)
        .ok_or_else(|| ConnectorError::invalid_input("Invoice ID is required", item_index))
}

fn invoice_url(api_url: &str, id: &str, action: Option<&str>) -> Result<String> {
    let mut segments: Vec<&str> = INVOICE_SEGMENTS.to_vec();
    segments.push(id);
    segments.extend(action);
    resource_url(api_url, &segments)
}

/// Invoice dates are sent without their time component.
fn date_only(value: &str) -> &str {
    value.split('T').next().unwrap_or(value)
}

/// `POST /v2/invoicing/invoices`. The invoice must be valid JSON.
pub async fn create_invoice<E: Execute + ?Sized>(
    ctx: &OperationContext<'_, E>,
    params: &ItemParameters,
    item_index: usize,
) -> Result<Vec<OutputRecord>> {
    let invoice = match &params.invoice {
        Some(value) => decode_json(value)
            .map_err(|_| ConnectorError::invalid_input("Invalid JSON for invoice", item_index))?,
        None => Value::Object(Map::new()),
    };

    let url = endpoint_url(ctx.api_url, INVOICES_PATH, &[])?;
    let request = RequestDescriptor::new(Method::POST, url)
        .bearer(ctx.token)
        .json(invoice);

    let exchange = ctx.executor.execute(request).await?;
    debug!("Created invoice for item {}", item_index);

    let raw = params.options.include_raw_data.then_some(&exchange);
    Ok(vec![OutputRecord::from_payload(
        exchange.response.clone(),
        raw,
    )])
}

/// `POST /v2/invoicing/invoices/{id}/send`.
///
/// Additional parameters that are not a JSON object are replaced by an empty
/// object instead of failing the item.
pub async fn send_invoice<E: Execute + ?Sized>(
    ctx: &OperationContext<'_, E>,
    params: &ItemParameters,
    item_index: usize,
) -> Result<Vec<OutputRecord>> {
    let id = invoice_id(params, item_index)?;

    let body = match params.additional_params.as_ref().map(decode_json) {
        Some(Ok(body)) if body.is_object() => body,
        Some(Ok(other)) => {
            debug!("Ignoring non-object send parameters for item {}: {}", item_index, other);
            json!({})
        }
        Some(Err(e)) => {
            debug!("Ignoring malformed send parameters for item {}: {}", item_index, e);
            json!({})
        }
        None => json!({}),
    };

    let url = invoice_url(ctx.api_url, id, Some("send"))?;
    let request = RequestDescriptor::new(Method::POST, url)
        .bearer(ctx.token)
        .json(body);

    let exchange = ctx.executor.execute(request).await?;

    let raw = params.options.include_raw_data.then_some(&exchange);
    Ok(vec![OutputRecord::from_payload(
        exchange.response.clone(),
        raw,
    )])
}

/// `PATCH /v2/invoicing/invoices/{id}` with a JSON Patch array.
///
/// The response body is only surfaced through the raw data; the record itself
/// is an acknowledgment.
pub async fn update_invoice<E: Execute + ?Sized>(
    ctx: &OperationContext<'_, E>,
    params: &ItemParameters,
    item_index: usize,
) -> Result<Vec<OutputRecord>> {
    let id = invoice_id(params, item_index)?;

    let patches = match &params.patches {
        Some(value) => decode_json(value)
            .map_err(|_| ConnectorError::invalid_input("Invalid JSON for patches", item_index))?,
        None => Value::Array(Vec::new()),
    };
    if !patches.is_array() {
        return Err(ConnectorError::invalid_input(
            "Patches must be a JSON array",
            item_index,
        ));
    }

    let url = invoice_url(ctx.api_url, id, None)?;
    let request = RequestDescriptor::new(Method::PATCH, url)
        .bearer(ctx.token)
        .json(patches);

    let exchange = ctx.executor.execute(request).await?;

    let raw = params.options.include_raw_data.then_some(&exchange);
    Ok(vec![OutputRecord::from_payload(
        json!({"success": true, "invoice_id": id}),
        raw,
    )])
}

/// `GET /v2/invoicing/invoices/{id}`.
pub async fn get_invoice<E: Execute + ?Sized>(
    ctx: &OperationContext<'_, E>,
    params: &ItemParameters,
    item_index: usize,
) -> Result<Vec<OutputRecord>> {
    let id = invoice_id(params, item_index)?;
    let url = invoice_url(ctx.api_url, id, None)?;

    let exchange = ctx.executor.execute(ctx.get(url)).await?;

    let raw = params.options.include_raw_data.then_some(&exchange);
    Ok(vec![OutputRecord::from_payload(
        exchange.response.clone(),
        raw,
    )])
}

fn list_query(params: &ItemParameters) -> Vec<(&'static str, String)> {
    let page_size = clamp_page_size(params.page_size, DEFAULT_PAGE_SIZE, MAX_INVOICE_PAGE_SIZE);

    let mut query = vec![
        ("page_size", page_size.to_string()),
        ("total_required", params.total_required.to_string()),
    ];

    if let Some(fields) = non_empty(&params.fields_invoices) {
        query.push(("fields", fields.to_string()));
    }
    if !params.status.is_empty() {
        query.push(("status", params.status.join(",")));
    }
    if let Some(email) = non_empty(&params.recipient_email) {
        query.push(("recipient_email", email.to_string()));
    }
    if let Some(date) = non_empty(&params.start_invoice_date) {
        query.push(("start_invoice_date", date_only(date).to_string()));
    }
    if let Some(date) = non_empty(&params.end_invoice_date) {
        query.push(("end_invoice_date", date_only(date).to_string()));
    }
    if !params.return_all {
        query.push(("page", page_number(params.page).to_string()));
    }

    query
}

/// `GET /v2/invoicing/invoices`, one record per invoice.
pub async fn list_invoices<E: Execute + ?Sized>(
    ctx: &OperationContext<'_, E>,
    params: &ItemParameters,
) -> Result<Vec<OutputRecord>> {
    let url = endpoint_url(ctx.api_url, INVOICES_PATH, &list_query(params))?;

    let Pages { entries, first } =
        fetch_pages(ctx.executor, ctx.get(url), INVOICE_ITEMS, params.return_all).await?;

    debug!("Fetched {} invoice(s)", entries.len());

    let raw = params.options.include_raw_data.then_some(&first);
    Ok(entries
        .into_iter()
        .map(|item| OutputRecord::from_payload(item, raw))
        .collect())
}

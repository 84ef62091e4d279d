//! Parameter bag delivered by the host for each input item.
//!
//! Field names follow the host's camelCase naming. Every field is optional at
//! this level; the operation handlers decide what is required.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options shared by all operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Attach `raw_request` and `raw_response` to every output record.
    pub include_raw_data: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemParameters {
    pub options: Options,

    // Pagination (Get Transactions, List Invoices)
    pub return_all: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,

    // Get Transactions
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub transaction_id: Option<String>,
    pub fields: Option<Vec<String>>,

    // Invoices
    pub invoice_id: Option<String>,
    pub invoice: Option<Value>,
    pub additional_params: Option<Value>,
    pub patches: Option<Value>,

    // List Invoices
    pub total_required: bool,
    pub fields_invoices: Option<String>,
    pub status: Vec<String>,
    pub recipient_email: Option<String>,
    pub start_invoice_date: Option<String>,
    pub end_invoice_date: Option<String>,
}

impl ItemParameters {
    /// Parses a JSON document holding either one parameter bag or an array of them.
    pub fn parse_items(input: &str) -> Result<Vec<ItemParameters>> {
        let value: Value = serde_json::from_str(input).context("Input is not valid JSON")?;
        let items = match value {
            Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<_>, _>>(),
            other => serde_json::from_value(other).map(|item| vec![item]),
        };
        items.context("Input does not match the expected parameter layout")
    }
}

/// Returns `Some` for non-blank strings.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Decodes a JSON parameter that may arrive as JSON text or as a structured value.
pub(crate) fn decode_json(value: &Value) -> Result<Value, serde_json::Error> {
    match value {
        Value::String(text) => serde_json::from_str(text),
        other => Ok(other.clone()),
    }
}

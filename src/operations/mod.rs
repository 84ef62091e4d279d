//! Operation handlers for the transaction and invoice resources.
//!
//! Each handler turns one parameter bag into PayPal requests and shapes the
//! responses into output records. Tokens are obtained by the dispatcher and
//! handed in through [`OperationContext`].

mod invoices;
mod transactions;

use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use std::fmt;
use std::str::FromStr;

use crate::auth::{AccessToken, Scope};
use crate::http::{Execute, RequestDescriptor};
use crate::params::ItemParameters;
use crate::record::OutputRecord;

pub use invoices::{
    INVOICES_PATH, MAX_INVOICE_PAGE_SIZE, create_invoice, get_invoice, list_invoices, send_invoice,
    update_invoice,
};
pub use transactions::{MAX_TRANSACTION_PAGE_SIZE, TRANSACTIONS_PATH, get_transactions};

/// PayPal API family an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Resource {
    #[default]
    Transaction,
    Invoice,
}

impl Resource {
    /// Scope the access token must carry for this resource.
    pub fn scope(self) -> Scope {
        match self {
            Resource::Transaction => Scope::ReportingSearchRead,
            Resource::Invoice => Scope::Invoicing,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Transaction => write!(f, "transaction"),
            Resource::Invoice => write!(f, "invoice"),
        }
    }
}

impl FromStr for Resource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transaction" => Ok(Resource::Transaction),
            "invoice" => Ok(Resource::Invoice),
            _ => anyhow::bail!(
                "Unknown resource: {}. Expected transaction or invoice.",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetTransactions,
    CreateInvoice,
    GetInvoice,
    ListInvoices,
    SendInvoice,
    UpdateInvoice,
}

impl Operation {
    /// Parses `operation` and checks that it belongs to `resource`.
    pub fn resolve(resource: Resource, operation: &str) -> Result<Self> {
        let operation: Operation = operation.parse()?;
        if operation.resource() != resource {
            anyhow::bail!(
                "Operation {} is not available for resource {}",
                operation,
                resource
            );
        }
        Ok(operation)
    }

    pub fn resource(self) -> Resource {
        match self {
            Operation::GetTransactions => Resource::Transaction,
            _ => Resource::Invoice,
        }
    }

    /// List and single-fetch operations use the first item only.
    pub fn runs_once(self) -> bool {
        matches!(
            self,
            Operation::GetTransactions | Operation::GetInvoice | Operation::ListInvoices
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            Operation::GetTransactions => "getTransactions",
            Operation::CreateInvoice => "createInvoice",
            Operation::GetInvoice => "getInvoice",
            Operation::ListInvoices => "listInvoices",
            Operation::SendInvoice => "sendInvoice",
            Operation::UpdateInvoice => "updateInvoice",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Operation::GetTransactions,
            Operation::CreateInvoice,
            Operation::GetInvoice,
            Operation::ListInvoices,
            Operation::SendInvoice,
            Operation::UpdateInvoice,
        ]
        .into_iter()
        .find(|op| op.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| anyhow!("Unknown operation: {}", s))
    }
}

/// What every handler needs besides its parameters.
pub struct OperationContext<'a, E: Execute + ?Sized> {
    pub executor: &'a E,
    pub token: &'a AccessToken,
    pub api_url: &'a str,
}

impl<E: Execute + ?Sized> OperationContext<'_, E> {
    fn get(&self, url: String) -> RequestDescriptor {
        RequestDescriptor::get(url).bearer(self.token)
    }
}

/// Runs `operation` for one item.
#[tracing::instrument(skip(ctx, params))]
pub async fn run<E: Execute + ?Sized>(
    operation: Operation,
    ctx: &OperationContext<'_, E>,
    params: &ItemParameters,
    item_index: usize,
) -> Result<Vec<OutputRecord>> {
    match operation {
        Operation::GetTransactions => get_transactions(ctx, params, item_index).await,
        Operation::CreateInvoice => create_invoice(ctx, params, item_index).await,
        Operation::GetInvoice => get_invoice(ctx, params, item_index).await,
        Operation::ListInvoices => list_invoices(ctx, params).await,
        Operation::SendInvoice => send_invoice(ctx, params, item_index).await,
        Operation::UpdateInvoice => update_invoice(ctx, params, item_index).await,
    }
}

/// Page size to send: `default` when unset or zero, never above `max`.
pub fn clamp_page_size(requested: Option<u32>, default: u32, max: u32) -> u32 {
    requested.filter(|&size| size > 0).unwrap_or(default).min(max)
}

/// Page number to send in single-page mode; pages start at 1.
pub fn page_number(requested: Option<u32>) -> u32 {
    requested.unwrap_or(1).max(1)
}

/// `api_url` + `path` with `query` appended in order. No `?` when `query` is empty.
fn endpoint_url(api_url: &str, path: &str, query: &[(&str, String)]) -> Result<String> {
    let mut url = Url::parse(&format!("{}{}", api_url, path))
        .with_context(|| format!("Invalid API URL {}", api_url))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url.to_string())
}

/// `api_url` with `segments` appended as percent-encoded path segments.
fn resource_url(api_url: &str, segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(api_url).with_context(|| format!("Invalid API URL {}", api_url))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("API URL {} cannot have a path", api_url))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.to_string())
}

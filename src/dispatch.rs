//! Runs one operation over the input items.

use anyhow::Result;
use log::{debug, info, warn};

use crate::auth::TokenProvider;
use crate::error::ItemFailure;
use crate::http::Execute;
use crate::operations::{self, Operation, OperationContext};
use crate::params::ItemParameters;
use crate::record::OutputRecord;

/// What happens when an item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Stop and return the error, tagged with the item index.
    #[default]
    Abort,
    /// Emit an `{"error": ...}` record for the item and carry on.
    Collect,
}

impl ErrorMode {
    pub fn from_continue_on_fail(continue_on_fail: bool) -> Self {
        if continue_on_fail {
            ErrorMode::Collect
        } else {
            ErrorMode::Abort
        }
    }
}

pub struct Dispatcher<T: TokenProvider, E: Execute> {
    tokens: T,
    executor: E,
    api_url: String,
}

impl<T: TokenProvider, E: Execute> Dispatcher<T, E> {
    pub fn new(tokens: T, executor: E, api_url: impl Into<String>) -> Self {
        Self {
            tokens,
            executor,
            api_url: api_url.into(),
        }
    }

    /// Fetches one token for the operation's resource and runs every item in order.
    ///
    /// Authentication failures end the run regardless of `mode`.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn run(
        &self,
        operation: Operation,
        items: &[ItemParameters],
        mode: ErrorMode,
    ) -> Result<Vec<OutputRecord>> {
        let scope = operation.resource().scope();
        let token = self.tokens.access_token(scope).await?;
        info!("Running {} over {} item(s)", operation, items.len());

        let ctx = OperationContext {
            executor: &self.executor,
            token: &token,
            api_url: &self.api_url,
        };

        let mut records = Vec::new();
        for (index, params) in items.iter().enumerate() {
            if index > 0 && operation.runs_once() {
                debug!(
                    "{} uses the first item only, skipping {} more",
                    operation,
                    items.len() - 1
                );
                break;
            }

            match operations::run(operation, &ctx, params, index).await {
                Ok(produced) => records.extend(produced),
                Err(e) => match mode {
                    ErrorMode::Collect => {
                        warn!("Item {} failed: {:#}", index, e);
                        records.push(OutputRecord::error(format!("{:#}", e), index));
                    }
                    ErrorMode::Abort => return Err(e.context(ItemFailure { item_index: index })),
                },
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessToken, MockTokenProvider, Scope};
    use crate::error::ConnectorError;
    use crate::http::{Exchange, MockExecute, RequestDescriptor};
    use crate::record::PairedItem;
    use mockall::predicate::{eq, function};
    use serde_json::{Value, json};

    const API: &str = "https://api.sandbox.paypal.com";

    fn tokens_for(scope: Scope) -> MockTokenProvider {
        let mut tokens = MockTokenProvider::new();
        tokens
            .expect_access_token()
            .with(eq(scope))
            .times(1)
            .returning(|_| Ok(AccessToken::new("A21AA-token")));
        tokens
    }

    fn echo_body(r: RequestDescriptor) -> Result<Exchange> {
        Ok(Exchange {
            response: r.body.clone().unwrap_or(Value::Null),
            request: r.redacted(),
        })
    }

    fn invoice_item(invoice: &str) -> ItemParameters {
        ItemParameters {
            invoice: Some(json!(invoice)),
            ..Default::default()
        }
    }

    #[test]
    fn test_error_mode_from_flag() {
        assert_eq!(ErrorMode::from_continue_on_fail(true), ErrorMode::Collect);
        assert_eq!(ErrorMode::from_continue_on_fail(false), ErrorMode::Abort);
        assert_eq!(ErrorMode::default(), ErrorMode::Abort);
    }

    #[tokio::test]
    async fn test_token_fetched_once_for_all_items() {
        let tokens = tokens_for(Scope::Invoicing);

        let mut executor = MockExecute::new();
        executor
            .expect_execute()
            .with(function(|r: &RequestDescriptor| {
                r.headers.get("authorization").map(String::as_str) == Some("Bearer A21AA-token")
            }))
            .times(3)
            .returning(echo_body);

        let dispatcher = Dispatcher::new(tokens, executor, API);
        let items = vec![
            invoice_item(r#"{"n": 1}"#),
            invoice_item(r#"{"n": 2}"#),
            invoice_item(r#"{"n": 3}"#),
        ];

        let records = dispatcher
            .run(Operation::CreateInvoice, &items, ErrorMode::Abort)
            .await
            .unwrap();

        let numbers: Vec<i64> = records
            .iter()
            .map(|r| r.json["n"].as_i64().unwrap())
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_runs_once_uses_first_item() {
        let tokens = tokens_for(Scope::Invoicing);

        let mut executor = MockExecute::new();
        executor
            .expect_execute()
            .with(function(|r: &RequestDescriptor| r.url.ends_with("/INV2-FIRST")))
            .times(1)
            .returning(|r| {
                Ok(Exchange {
                    response: json!({"id": "INV2-FIRST"}),
                    request: r.redacted(),
                })
            });

        let dispatcher = Dispatcher::new(tokens, executor, API);
        let items: Vec<ItemParameters> = ["INV2-FIRST", "INV2-SECOND", "INV2-THIRD"]
            .iter()
            .map(|id| ItemParameters {
                invoice_id: Some(id.to_string()),
                ..Default::default()
            })
            .collect();

        let records = dispatcher
            .run(Operation::GetInvoice, &items, ErrorMode::Abort)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].json["id"], "INV2-FIRST");
    }

    #[tokio::test]
    async fn test_collect_mode_emits_error_record_and_continues() {
        let tokens = tokens_for(Scope::Invoicing);

        let mut executor = MockExecute::new();
        executor.expect_execute().times(2).returning(echo_body);

        let dispatcher = Dispatcher::new(tokens, executor, API);
        let items = vec![
            invoice_item(r#"{"n": 1}"#),
            invoice_item("{broken"),
            invoice_item(r#"{"n": 3}"#),
        ];

        let records = dispatcher
            .run(Operation::CreateInvoice, &items, ErrorMode::Collect)
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].json["n"], 1);
        assert_eq!(
            Value::Object(records[1].json.clone()),
            json!({"error": "Invalid JSON for invoice [item 1]"})
        );
        assert_eq!(records[1].paired_item, Some(PairedItem { item: 1 }));
        assert_eq!(records[2].json["n"], 3);
    }

    #[tokio::test]
    async fn test_collect_mode_surfaces_api_errors() {
        let tokens = tokens_for(Scope::Invoicing);

        let mut executor = MockExecute::new();
        executor.expect_execute().times(1).returning(|_| {
            Err(ConnectorError::Api {
                status: 404,
                body: json!({"name": "RESOURCE_NOT_FOUND", "message": "The specified resource does not exist."}),
            }
            .into())
        });

        let dispatcher = Dispatcher::new(tokens, executor, API);
        let items = vec![ItemParameters {
            invoice_id: Some("INV2-MISSING".into()),
            ..Default::default()
        }];

        let records = dispatcher
            .run(Operation::SendInvoice, &items, ErrorMode::Collect)
            .await
            .unwrap();

        assert_eq!(
            records[0].json["error"],
            "PayPal API error (HTTP 404): The specified resource does not exist."
        );
        assert_eq!(records[0].paired_item, Some(PairedItem { item: 0 }));
    }

    #[tokio::test]
    async fn test_collect_mode_keeps_underlying_cause() {
        let tokens = tokens_for(Scope::Invoicing);

        let mut executor = MockExecute::new();
        executor.expect_execute().times(1).returning(|_| {
            Err(anyhow::anyhow!("tcp connect error: Connection refused")
                .context("Failed to send request to PayPal"))
        });

        let dispatcher = Dispatcher::new(tokens, executor, API);
        let items = vec![ItemParameters {
            invoice_id: Some("INV2-1".into()),
            ..Default::default()
        }];

        let records = dispatcher
            .run(Operation::GetInvoice, &items, ErrorMode::Collect)
            .await
            .unwrap();

        assert_eq!(
            records[0].json["error"],
            "Failed to send request to PayPal: tcp connect error: Connection refused"
        );
        assert_eq!(records[0].paired_item, Some(PairedItem { item: 0 }));
    }

    #[tokio::test]
    async fn test_abort_mode_tags_item_index() {
        let tokens = tokens_for(Scope::Invoicing);

        let mut executor = MockExecute::new();
        executor.expect_execute().times(1).returning(echo_body);

        let dispatcher = Dispatcher::new(tokens, executor, API);
        let items = vec![
            ItemParameters {
                invoice_id: Some("INV2-1".into()),
                patches: Some(json!([])),
                ..Default::default()
            },
            ItemParameters {
                invoice_id: Some("INV2-2".into()),
                patches: Some(json!("not json")),
                ..Default::default()
            },
            ItemParameters {
                invoice_id: Some("INV2-3".into()),
                ..Default::default()
            },
        ];

        let err = dispatcher
            .run(Operation::UpdateInvoice, &items, ErrorMode::Abort)
            .await
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<ItemFailure>(),
            Some(&ItemFailure { item_index: 1 })
        );
        assert!(matches!(
            err.downcast_ref::<ConnectorError>(),
            Some(ConnectorError::InvalidInput { item_index: 1, .. })
        ));
    }

    #[test_log::test(tokio::test)]
    async fn test_authentication_failure_is_terminal_in_collect_mode() {
        let mut tokens = MockTokenProvider::new();
        tokens
            .expect_access_token()
            .with(eq(Scope::ReportingSearchRead))
            .times(1)
            .returning(|_| {
                Err(anyhow::anyhow!("PayPal API error (HTTP 401)")
                    .context(ConnectorError::Authentication))
            });

        let mut executor = MockExecute::new();
        executor.expect_execute().never();

        let dispatcher = Dispatcher::new(tokens, executor, API);
        let err = dispatcher
            .run(
                Operation::GetTransactions,
                &[ItemParameters::default()],
                ErrorMode::Collect,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ConnectorError>(),
            Some(ConnectorError::Authentication)
        ));
    }

    #[tokio::test]
    async fn test_no_items_produces_no_records() {
        let tokens = tokens_for(Scope::ReportingSearchRead);
        let mut executor = MockExecute::new();
        executor.expect_execute().never();

        let dispatcher = Dispatcher::new(tokens, executor, API);
        let records = dispatcher
            .run(Operation::GetTransactions, &[], ErrorMode::Abort)
            .await
            .unwrap();

        assert!(records.is_empty());
    }
}

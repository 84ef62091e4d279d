//! Error kinds the connector distinguishes.
//!
//! Everything is propagated as `anyhow::Error`; these types are attached to
//! the chain so callers can recover them with `downcast_ref`.

use serde_json::Value;

/// HTTP status PayPal uses for rate limiting.
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Errors that callers may want to match on.
#[derive(Debug)]
pub enum ConnectorError {
    /// Client-credentials exchange failed. The cause is the next link in the chain.
    Authentication,
    /// PayPal answered with a non-success status.
    Api { status: u16, body: Value },
    /// A mandatory parameter was missing or not valid JSON.
    InvalidInput { message: String, item_index: usize },
}

impl ConnectorError {
    /// Whether this is a rate-limit response that may be retried.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ConnectorError::Api { status, .. } if *status == TOO_MANY_REQUESTS)
    }

    pub(crate) fn invalid_input(message: impl Into<String>, item_index: usize) -> anyhow::Error {
        anyhow::Error::from(ConnectorError::InvalidInput {
            message: message.into(),
            item_index,
        })
    }
}

impl std::fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorError::Authentication => {
                write!(
                    f,
                    "PayPal authentication failed. Check the client ID, client secret and environment."
                )
            }
            ConnectorError::Api { status, body } => match api_message(body) {
                Some(message) => write!(f, "PayPal API error (HTTP {}): {}", status, message),
                None => write!(f, "PayPal API error (HTTP {})", status),
            },
            ConnectorError::InvalidInput {
                message,
                item_index,
            } => {
                write!(f, "{} [item {}]", message, item_index)
            }
        }
    }
}

impl std::error::Error for ConnectorError {}

/// Marks the input item an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemFailure {
    pub item_index: usize,
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to process item {}", self.item_index)
    }
}

/// Pulls a human-readable message out of a PayPal error body.
///
/// PayPal uses `message` on the v1/v2 REST APIs and `error_description` on the
/// OAuth endpoint. Plain-text bodies are used as-is.
fn api_message(body: &Value) -> Option<&str> {
    match body {
        Value::String(s) if !s.is_empty() => Some(s.as_str()),
        Value::Object(map) => ["message", "error_description", "name"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str)),
        _ => None,
    }
}

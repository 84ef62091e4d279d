//! HTTP client with rate-limit retry and request capture.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, Method};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::retry::{MAX_RETRIES, Sleeper, TokioSleeper, backoff_delay};
use crate::auth::AccessToken;
use crate::error::ConnectorError;

/// Placeholder shown instead of the Authorization header value.
pub const REDACTED: &str = "[REDACTED]";

/// A normalized request as handed to the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Adds `Authorization: Bearer <token>`.
    pub fn bearer(mut self, token: &AccessToken) -> Self {
        self.headers.insert(
            AUTHORIZATION.as_str().to_string(),
            format!("Bearer {}", token.secret()),
        );
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Same method, headers and body against another URL.
    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }

    /// Echo of the request that is safe to surface to callers.
    pub fn redacted(&self) -> Value {
        let headers: Map<String, Value> = self
            .headers
            .iter()
            .map(|(name, value)| {
                let value = if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                    REDACTED.to_string()
                } else {
                    value.clone()
                };
                (name.clone(), Value::String(value))
            })
            .collect();

        let mut echo = json!({
            "method": self.method.as_str(),
            "url": self.url,
            "headers": headers,
        });
        if let Some(body) = &self.body {
            echo["body"] = body.clone();
        }
        echo
    }
}

/// A completed request: the decoded response and the redacted request echo.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub response: Value,
    pub request: Value,
}

/// Executes a single logical request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(&self, request: RequestDescriptor) -> Result<Exchange>;
}

/// HTTP client that retries rate-limited requests with exponential backoff.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    sleeper: Arc<dyn Sleeper>,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self::with_sleeper(client, Arc::new(TokioSleeper))
    }

    /// Creates a client that waits between retries through `sleeper`.
    pub fn with_sleeper(client: Client, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { client, sleeper }
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Single attempt without retry. Non-2xx statuses become `ConnectorError::Api`.
    async fn send_once(&self, request: &RequestDescriptor) -> Result<Value> {
        let mut builder = self.client.request(request.method.clone(), &request.url);

        for (name, value) in &request.headers {
            let mut value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header {}", name))?;
            if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                value.set_sensitive(true);
            }
            builder = builder.header(name.as_str(), value);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .context("Failed to send request to PayPal")?;

        let status = response.status();
        let body = decode_body(response).await?;

        if !status.is_success() {
            return Err(ConnectorError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(body)
    }
}

#[async_trait]
impl Execute for HttpClient {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: RequestDescriptor) -> Result<Exchange> {
        let mut retries_remaining = MAX_RETRIES;

        loop {
            debug!("{} {}...", request.method, request.url);

            match self.send_once(&request).await {
                Ok(response) => {
                    return Ok(Exchange {
                        response,
                        request: request.redacted(),
                    });
                }
                Err(e) if retries_remaining > 0 && is_rate_limited(&e) => {
                    let delay = backoff_delay(retries_remaining);
                    warn!(
                        "{} {}: rate limited, retry {}/{} in {}ms...",
                        request.method,
                        request.url,
                        MAX_RETRIES - retries_remaining + 1,
                        MAX_RETRIES,
                        delay.as_millis()
                    );
                    self.sleeper.sleep(delay).await;
                    retries_remaining -= 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_rate_limited(e: &anyhow::Error) -> bool {
    e.downcast_ref::<ConnectorError>()
        .is_some_and(ConnectorError::is_rate_limited)
}

/// Empty bodies decode to `null`; bodies that are not JSON are kept as text.
async fn decode_body(response: reqwest::Response) -> Result<Value> {
    let text = response
        .text()
        .await
        .context("Failed to read response body")?;

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

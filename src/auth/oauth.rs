//! Token endpoint client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;

use super::{AccessToken, Credentials, Scope, TokenProvider};
use crate::error::ConnectorError;

/// Partner attribution sent with every token request.
pub const PARTNER_ATTRIBUTION_HEADER: &str = "Partner-Attribution-Id";
pub const PARTNER_ATTRIBUTION_ID: &str = "ANGELLFREEInc_SP_n8n";

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Requests tokens from `/v1/oauth2/token` with HTTP basic auth.
pub struct OAuthTokenProvider {
    client: Client,
    credentials: Credentials,
    api_url: String,
}

impl OAuthTokenProvider {
    /// Provider for the environment named in `credentials`.
    pub fn new(client: Client, credentials: Credentials) -> Self {
        let api_url = credentials.environment.api_url().to_string();
        Self::with_api_url(client, credentials, &api_url)
    }

    /// Provider talking to a custom base URL.
    pub fn with_api_url(client: Client, credentials: Credentials, api_url: &str) -> Self {
        Self {
            client,
            credentials,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn request_token(&self, scope: Scope) -> Result<AccessToken> {
        let url = format!("{}/v1/oauth2/token", self.api_url);
        debug!("Requesting access token for scope {} from {}...", scope, url);

        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(PARTNER_ATTRIBUTION_HEADER, PARTNER_ATTRIBUTION_ID)
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", scope.as_uri()),
            ])
            .send()
            .await
            .context("Failed to send token request to PayPal")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(ConnectorError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .context("Failed to parse token response from PayPal")?;

        debug!(
            "Obtained access token for scope {} (expires in {:?}s)",
            scope, token.expires_in
        );

        Ok(AccessToken::new(token.access_token))
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenProvider {
    #[tracing::instrument(skip(self))]
    async fn access_token(&self, scope: Scope) -> Result<AccessToken> {
        self.request_token(scope)
            .await
            .context(ConnectorError::Authentication)
    }
}

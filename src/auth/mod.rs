//! Client-credentials authentication against PayPal.
//!
//! A token is requested once per invocation for the scope of the resource
//! being used, and is never cached beyond that.

mod oauth;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

pub use oauth::{OAuthTokenProvider, PARTNER_ATTRIBUTION_HEADER, PARTNER_ATTRIBUTION_ID};

/// PayPal environment the credentials belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

impl Environment {
    /// Base URL of the REST API for this environment.
    pub fn api_url(self) -> &'static str {
        match self {
            Environment::Sandbox => "https://api.sandbox.paypal.com",
            Environment::Production => "https://api.paypal.com",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Sandbox => write!(f, "sandbox"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sandbox" => Ok(Environment::Sandbox),
            "production" | "live" => Ok(Environment::Production),
            _ => anyhow::bail!(
                "Unknown PayPal environment: {}. Expected sandbox or production.",
                s
            ),
        }
    }
}

/// REST app credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub environment: Environment,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("environment", &self.environment)
            .finish()
    }
}

/// OAuth2 scope a token is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Read access to the transaction search API.
    ReportingSearchRead,
    /// Full access to the invoicing API.
    Invoicing,
}

impl Scope {
    pub fn as_uri(self) -> &'static str {
        match self {
            Scope::ReportingSearchRead => "https://uri.paypal.com/services/reporting/search/read",
            Scope::Invoicing => "https://uri.paypal.com/services/invoicing",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_uri())
    }
}

/// Bearer token. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Source of access tokens.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Exchange credentials for a token valid for `scope`.
    ///
    /// Failures carry `ConnectorError::Authentication` in their chain.
    async fn access_token(&self, scope: Scope) -> Result<AccessToken>;
}

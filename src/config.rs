use anyhow::Result;
use log::debug;
use reqwest::Client;

use crate::{
    auth::{Credentials, OAuthTokenProvider},
    dispatch::Dispatcher,
    http::HttpClient,
};

pub const USER_AGENT: &str = "paypal-connector";

/// Everything one invocation needs, sharing a single reqwest Client.
pub struct Config {
    pub tokens: OAuthTokenProvider,
    pub executor: HttpClient,
    pub api_url: String,
}

impl Config {
    /// `api_url` overrides the base URL of the credentials' environment.
    pub fn new(credentials: Credentials, api_url: Option<String>) -> Result<Self> {
        let api_url = api_url
            .unwrap_or_else(|| credentials.environment.api_url().to_string())
            .trim_end_matches('/')
            .to_string();
        debug!(
            "Using PayPal {} API at {}",
            credentials.environment, api_url
        );

        let client = Client::builder().user_agent(USER_AGENT).build()?;

        let tokens = OAuthTokenProvider::with_api_url(client.clone(), credentials, &api_url);
        let executor = HttpClient::new(client);

        Ok(Self {
            tokens,
            executor,
            api_url,
        })
    }

    pub fn into_dispatcher(self) -> Dispatcher<OAuthTokenProvider, HttpClient> {
        Dispatcher::new(self.tokens, self.executor, self.api_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Environment;
    use mockito::Server;

    fn credentials(environment: Environment) -> Credentials {
        Credentials {
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            environment,
        }
    }

    #[test]
    fn test_config_uses_environment_url() {
        let config = Config::new(credentials(Environment::Production), None).unwrap();
        assert_eq!(config.api_url, "https://api.paypal.com");
        assert_eq!(config.tokens.api_url(), "https://api.paypal.com");

        let config = Config::new(credentials(Environment::Sandbox), None).unwrap();
        assert_eq!(config.api_url, "https://api.sandbox.paypal.com");
    }

    #[test]
    fn test_config_override_trims_trailing_slash() {
        let config = Config::new(
            credentials(Environment::Sandbox),
            Some("http://127.0.0.1:8080/".into()),
        )
        .unwrap();
        assert_eq!(config.api_url, "http://127.0.0.1:8080");
        assert_eq!(config.tokens.api_url(), "http://127.0.0.1:8080");
    }

    #[tokio::test]
    async fn test_config_client_sends_user_agent() {
        // --- Setup ---

        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("user-agent", USER_AGENT)
            .create_async()
            .await;

        // --- Execute ---

        let config = Config::new(credentials(Environment::Sandbox), Some(server.url())).unwrap();
        let _ = config.executor.inner().get(server.url()).send().await;

        // --- Verify ---

        mock.assert_async().await;
    }
}

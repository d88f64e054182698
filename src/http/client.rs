//! HTTP client for the service API
//!
//! Provides the request channel used by every component:
//! - URL construction from the configured base URL and API version
//! - Bearer authentication when a session token is supplied
//! - Error classification of non-2xx responses

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters
    pub query: HashMap<String, String>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<Value>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Request channel to the service API
///
/// Cheap to clone; clones share the connection pool and configuration.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    /// Client for object storage transfers, without a total request timeout
    storage: Client,
    config: Arc<ClientConfig>,
}

impl ApiClient {
    /// Create a client for the given configuration
    pub fn new(config: Arc<ClientConfig>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;

        // A transfer may take arbitrarily long; only connecting is bounded.
        let storage = Client::builder()
            .connect_timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            storage,
            config,
        })
    }

    /// Client used for transfers to signed storage URLs
    pub fn storage(&self) -> &Client {
        &self.storage
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Make a request against an API path
    ///
    /// `operation` names the call in error messages. When `token` is set the
    /// request carries `Authorization: Bearer <token>`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        config: RequestConfig,
        token: Option<&str>,
        operation: &str,
    ) -> Result<Response> {
        let url = self.config.endpoint(path);
        let mut req = self.client.request(method.clone(), &url);

        for (key, value) in &config.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if !config.query.is_empty() {
            req = req.query(&config.query);
        }

        if let Some(ref body) = config.body {
            req = req.json(body);
        }

        if let Some(token) = token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("{} {} -> {}", method, url, status.as_u16());
            return Err(Error::api(operation, status.as_u16(), body));
        }

        debug!("Request succeeded: {} {}", method, url);
        Ok(response)
    }

    /// Make a request and parse the JSON response
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        config: RequestConfig,
        token: Option<&str>,
        operation: &str,
    ) -> Result<T> {
        let response = self.request(method, path, config, token, operation).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| Error::decode(format!("{operation}: invalid response body: {e}")))
    }

    /// POST a JSON body with a bearer token, discarding the response body
    pub async fn post(&self, path: &str, body: Value, token: &str, operation: &str) -> Result<()> {
        self.request(
            Method::POST,
            path,
            RequestConfig::new().json(body),
            Some(token),
            operation,
        )
        .await?;
        Ok(())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("api_version", &self.config.api_version)
            .finish_non_exhaustive()
    }
}

//! Session token management
//!
//! Handles login and the re-authenticate-on-401 wrapper around remote calls.

use super::types::Credentials;
use crate::error::{Error, Result};
use crate::http::{ApiClient, RequestConfig};
use reqwest::Method;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Login response body
#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Authenticated session against the service
///
/// Clones share the same token.
#[derive(Clone)]
pub struct AuthSession {
    /// Request channel
    client: ApiClient,
    /// Long-lived credentials
    credentials: Credentials,
    /// Current session token, absent until the first login
    token: Arc<RwLock<Option<String>>>,
}

impl AuthSession {
    /// Create a session; no request is made until the first login
    pub fn new(client: ApiClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Exchange the credentials for a session token
    ///
    /// The token is stored only if the call succeeds and the token carries
    /// the configured type prefix.
    pub async fn login(&self) -> Result<String> {
        let body = serde_json::to_value(&self.credentials)?;

        let response: LoginResponse = self
            .client
            .request_json(
                Method::POST,
                "/servers",
                RequestConfig::new().json(body),
                None,
                "login",
            )
            .await
            .map_err(|e| Error::auth(format!("login request failed: {e}")))?;

        let prefix = self.client.config().token_prefix.as_str();
        if !response.token.starts_with(prefix) {
            return Err(Error::auth(format!(
                "service returned a token without the expected '{prefix}' prefix"
            )));
        }

        let mut cached = self.token.write().await;
        *cached = Some(response.token.clone());

        info!("Authenticated as {}", self.credentials.username());
        Ok(response.token)
    }

    /// Current session token, if logged in
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Check whether a session token is held
    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Run `operation` with a valid session token
    ///
    /// Logs in first when no token is held. When the operation fails with
    /// HTTP 401 the session logs in again and retries, up to
    /// `max_auth_attempts` total attempts. Any other failure is returned
    /// as-is. Exhausting the attempts yields [`Error::Auth`].
    pub async fn ensure_authenticated<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.client.config().max_auth_attempts.max(1);

        // Concurrent first calls may each log in; login is idempotent.
        let mut token = match self.token().await {
            Some(token) => token,
            None => self.login().await?,
        };

        let mut attempt = 1;
        loop {
            match operation(token.clone()).await {
                Err(e) if e.is_unauthorized() => {
                    if attempt >= max_attempts {
                        return Err(Error::auth(format!(
                            "request still unauthorized after {attempt} attempts: {e}"
                        )));
                    }
                    warn!(
                        "Session token rejected, attempt {}/{}, logging in again",
                        attempt, max_attempts
                    );
                    token = self.login().await?;
                    attempt += 1;
                }
                result => {
                    debug!("Authenticated operation finished after {} attempt(s)", attempt);
                    return result;
                }
            }
        }
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("client", &self.client)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

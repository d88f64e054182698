//! Credential types

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Long-lived credentials exchanged for a session token
///
/// Parsed from `accessKey:secretKey:username`. The secret key is redacted
/// from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    access_key: String,
    secret_key: String,
    username: String,
}

impl Credentials {
    /// Create credentials from their parts
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            username: username.into(),
        }
    }

    /// Parse `accessKey:secretKey:username`
    pub fn parse(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.trim().split(':').collect();
        match parts.as_slice() {
            [access, secret, user]
                if !access.is_empty() && !secret.is_empty() && !user.is_empty() =>
            {
                Ok(Self::new(*access, *secret, *user))
            }
            _ => Err(Error::validation(
                "credentials must have the form 'accessKey:secretKey:username'",
            )),
        }
    }

    /// Access key
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Username
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl FromStr for Credentials {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

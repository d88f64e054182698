//! HTTP client module
//!
//! Thin JSON-over-HTTPS channel to the service. Every call is named after
//! the operation it performs so non-2xx responses surface as
//! [`Error::Api`](crate::Error::Api) with enough context to diagnose.
//!
//! This layer never retries; re-authentication on 401 is handled by
//! [`AuthSession`](crate::auth::AuthSession).

mod client;

pub use client::{ApiClient, RequestConfig};

//! Authentication module
//!
//! Exchanges long-lived credentials for a short-lived session token and
//! re-authenticates transparently when the service answers 401.
//!
//! The `AuthSession` holds the token shared by all calls of one client.

mod session;
mod types;

pub use session::AuthSession;
pub use types::Credentials;

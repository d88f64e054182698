// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # duckpush
//!
//! Client library for a hosted analytical SQL service: run parameterized
//! queries and push in-memory records into remote tables.
//!
//! ## Features
//!
//! - **Session Auth**: credential login with automatic re-login on HTTP 401
//! - **Parameterized SQL**: `$1..$N` placeholders rewritten for the engine
//! - **Schema Inference**: column types derived from the first record
//! - **Parquet Staging**: records serialized locally and streamed to object storage
//! - **Plain or Dedup Import**: append all rows, or only rows with unseen keys
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use duckpush::{Client, PushOptions, Record, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::new("access:secret:alice", false)?;
//!
//!     let rows = vec![
//!         Record::new().with("id", 1).with("name", "Alice"),
//!         Record::new().with("id", 2).with("name", "Bob"),
//!     ];
//!     client
//!         .push("students", &rows, &PushOptions::new().dedupe_on(["id"]))
//!         .await?;
//!
//!     let found = client
//!         .execute("SELECT name FROM students WHERE id = $1", &[2.into()])
//!         .await?;
//!     println!("{found:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                            Client                             │
//! │        login()     execute(sql, params)     push(...)         │
//! └───────────────────────────────────────────────────────────────┘
//!                │ AuthSession::ensure_authenticated
//! ┌──────────┬──────────┬───────────┬───────────┬────────────────┐
//! │  Query   │  Table   │  Output   │  Staging  │    Import      │
//! ├──────────┼──────────┼───────────┼───────────┼────────────────┤
//! │ $N → ?   │ DB/schema│ Inference │ Presigned │ Plain          │
//! │ Zip rows │ Create   │ Arrow     │ Streamed  │ Dedup          │
//! │          │ Drop     │ Parquet   │ PUT       │ Delete staged  │
//! └──────────┴──────────┴───────────┴───────────┴────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Client configuration
pub mod config;

/// Session authentication
pub mod auth;

/// HTTP channel to the service API
pub mod http;

/// Column type inference
pub mod schema;

/// Arrow/Parquet serialization
pub mod output;

/// Presigned staging uploads
pub mod staging;

/// Table lifecycle
pub mod table;

/// Staged file imports
pub mod import;

/// SQL execution
pub mod query;

/// Push progress reporting
pub mod progress;

/// Push pipeline
pub mod engine;

/// Client facade
pub mod client;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::Client;
pub use config::ClientConfig;
pub use engine::{PushOptions, PushSummary};
pub use error::{Error, Result};
pub use progress::{ImportMode, ProgressObserver, PushStage};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! CLI module
//!
//! Command-line interface over [`Client`](crate::Client).
//!
//! # Commands
//!
//! - `login` - Verify credentials
//! - `query` - Run SQL and print the rows
//! - `push` - Load a JSON or JSON-lines file into a table

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, CREDENTIALS_ENV};
pub use runner::{parse_param, parse_records, Runner};

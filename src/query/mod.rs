//! Query execution
//!
//! Runs SQL on the hosted engine:
//! - `$1..$N` placeholders are rewritten to the engine's native `?` markers
//! - result rows are zipped with the column names into [`Record`](crate::Record)s

mod executor;
mod params;

pub use executor::{QueryExecutor, QueryResponse};
pub use params::rewrite_placeholders;

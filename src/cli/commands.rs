//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Environment variable holding `accessKey:secretKey:username`
pub const CREDENTIALS_ENV: &str = "DUCKPUSH_CREDENTIALS";

/// duckpush CLI
#[derive(Parser, Debug)]
#[command(name = "duckpush")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Credentials as accessKey:secretKey:username (defaults to $DUCKPUSH_CREDENTIALS)
    #[arg(short, long, global = true)]
    pub token: Option<String>,

    /// Client configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify credentials by logging in
    Login,

    /// Run SQL and print the result rows
    Query {
        /// SQL with $1..$N placeholders
        sql: String,

        /// Positional parameter as JSON (repeatable, in $N order)
        #[arg(short, long = "param")]
        params: Vec<String>,
    },

    /// Push records from a file into a table
    Push {
        /// Target table (`table` or `database.schema.table`)
        table: String,

        /// Input file: a JSON array of objects or one object per line
        file: PathBuf,

        /// Drop and re-create the table first
        #[arg(long)]
        replace: bool,

        /// Do not create the database, schema or table
        #[arg(long)]
        no_create: bool,

        /// Primary key column for deduplicated append (repeatable)
        #[arg(long = "dedupe-key")]
        dedupe_keys: Vec<String>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one row per line)
    Json,
    /// Human-readable output
    Pretty,
}

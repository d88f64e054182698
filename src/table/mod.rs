//! Table lifecycle
//!
//! Makes sure the destination database, schema and table exist before an
//! import, and drops the table when a push replaces it. Every statement is
//! idempotent except the drop, which is guarded by `IF EXISTS`.

use crate::error::Result;
use crate::http::ApiClient;
use crate::query::QueryExecutor;
use crate::schema::{infer_columns, Column};
use crate::types::{Record, TableRef};
use serde_json::json;
use tracing::debug;

/// `CREATE SCHEMA IF NOT EXISTS` for the table's schema
pub fn create_schema_sql(table: &TableRef) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", table.quoted_schema())
}

/// `CREATE TABLE IF NOT EXISTS` with the given columns
pub fn create_table_sql(table: &TableRef, columns: &[Column]) -> String {
    let definitions: Vec<String> = columns.iter().map(Column::sql_definition).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        table.quoted(),
        definitions.join(", ")
    )
}

/// `DROP TABLE IF EXISTS`
pub fn drop_table_sql(table: &TableRef) -> String {
    format!("DROP TABLE IF EXISTS {}", table.quoted())
}

/// Creates and drops destination tables
#[derive(Debug, Clone)]
pub struct TableManager {
    client: ApiClient,
    executor: QueryExecutor,
}

impl TableManager {
    /// Create a manager over the given channel
    pub fn new(client: ApiClient) -> Self {
        let executor = QueryExecutor::new(client.clone());
        Self { client, executor }
    }

    /// Create the database (a conflict means it already exists) and schema
    pub async fn ensure_database_and_schema(&self, table: &TableRef, token: &str) -> Result<()> {
        let operation = format!("create database {}", table.database());
        let body = json!({ "name": table.database(), "insert_database": true });

        match self.client.post("/databases", body, token, &operation).await {
            Ok(()) => debug!("Created database {}", table.database()),
            Err(e) if e.status() == Some(409) => {
                debug!("Database {} already exists", table.database());
            }
            Err(e) => return Err(e),
        }

        self.executor
            .run_statement(
                &create_schema_sql(table),
                token,
                &format!("create schema {}.{}", table.database(), table.schema()),
            )
            .await
    }

    /// Create the table with columns inferred from the sample record
    pub async fn create_table(&self, table: &TableRef, sample: &Record, token: &str) -> Result<()> {
        let columns = infer_columns(sample);
        self.executor
            .run_statement(
                &create_table_sql(table, &columns),
                token,
                &format!("create table {table}"),
            )
            .await
    }

    /// Drop the table, discarding its rows
    pub async fn replace_table(&self, table: &TableRef, token: &str) -> Result<()> {
        self.executor
            .run_statement(&drop_table_sql(table), token, &format!("drop table {table}"))
            .await
    }
}

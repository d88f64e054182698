//! SQL execution against the hosted engine

use super::params::rewrite_placeholders;
use crate::error::{Error, Result};
use crate::http::{ApiClient, RequestConfig};
use crate::types::{JsonValue, Record, Value};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Result set returned by the query endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    /// Column names in result order
    #[serde(default)]
    pub columns: Vec<String>,
    /// Rows of positional values
    #[serde(default)]
    pub rows: Vec<Vec<JsonValue>>,
}

impl QueryResponse {
    /// Zip every row with the column names
    pub fn into_records(self) -> Result<Vec<Record>> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != columns.len() {
                    return Err(Error::decode(format!(
                        "row {i} has {} values but the result has {} columns",
                        row.len(),
                        columns.len()
                    )));
                }
                Ok(columns
                    .iter()
                    .zip(row.iter())
                    .map(|(name, value)| (name.clone(), Value::from_json(value)))
                    .collect::<Record>())
            })
            .collect()
    }
}

/// Executes SQL through the query endpoint
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    client: ApiClient,
}

impl QueryExecutor {
    /// Create an executor over the given channel
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Run a parameterized query and return its rows as records
    ///
    /// Placeholders are validated before anything is sent.
    pub async fn execute(&self, sql: &str, params: &[Value], token: &str) -> Result<Vec<Record>> {
        let (sql, params) = rewrite_placeholders(sql, params)?;
        let response = self.send(&sql, &params, token, "query").await?;
        response.into_records()
    }

    /// Run a statement whose result rows are not needed (DDL)
    pub async fn run_statement(&self, sql: &str, token: &str, operation: &str) -> Result<()> {
        debug!("{}: {}", operation, sql);
        self.client
            .request(
                Method::POST,
                "/query",
                RequestConfig::new().json(json!({ "sql": sql })),
                Some(token),
                operation,
            )
            .await?;
        Ok(())
    }

    async fn send(
        &self,
        sql: &str,
        params: &[Value],
        token: &str,
        operation: &str,
    ) -> Result<QueryResponse> {
        let mut body = json!({ "sql": sql });
        if !params.is_empty() {
            body["parameters"] = JsonValue::Array(params.iter().map(Value::to_json).collect());
        }

        debug!("Executing query with {} parameter(s)", params.len());
        let response = self
            .client
            .request(
                Method::POST,
                "/query",
                RequestConfig::new().json(body),
                Some(token),
                operation,
            )
            .await?;

        // Statements without a result set may come back with an empty body
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(QueryResponse::default());
        }
        serde_json::from_str(&text)
            .map_err(|e| Error::decode(format!("{operation}: invalid response body: {e}")))
    }
}

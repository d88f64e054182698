//! Import coordination
//!
//! Tells the service to load a staged Parquet object into a table, either
//! as a plain append or as a primary-key-deduplicated append, and removes
//! the staged object afterwards.
//!
//! Dedup semantics belong to the service: rows are deduplicated by key
//! equality on the specified columns; only previously-unseen keys are
//! inserted.

use crate::error::Result;
use crate::http::{ApiClient, RequestConfig};
use crate::types::TableRef;
use reqwest::Method;
use serde_json::json;
use tracing::debug;

/// Runs imports of staged objects
#[derive(Debug, Clone)]
pub struct ImportCoordinator {
    client: ApiClient,
}

impl ImportCoordinator {
    /// Create a coordinator over the given channel
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Append every staged row to the table
    pub async fn import_plain(&self, table: &TableRef, staged_key: &str, token: &str) -> Result<()> {
        debug!("Plain import of {} into {}", staged_key, table);
        self.client
            .post(
                "/tables/s3_parquet_import",
                json!({
                    "table_name": table.to_string(),
                    "s3_key": staged_key,
                }),
                token,
                &format!("plain import into {table}"),
            )
            .await
    }

    /// Append only staged rows whose primary key is not already present
    pub async fn import_dedup(
        &self,
        table: &TableRef,
        staged_key: &str,
        primary_key_columns: &[String],
        token: &str,
    ) -> Result<()> {
        debug!(
            "Dedup import of {} into {} on ({})",
            staged_key,
            table,
            primary_key_columns.join(", ")
        );
        self.client
            .post(
                "/tables/s3_parquet_import_append_only_dedupe",
                json!({
                    "table_name": table.to_string(),
                    "s3_key": staged_key,
                    "primary_key_columns": primary_key_columns,
                }),
                token,
                &format!("dedup import into {table}"),
            )
            .await
    }

    /// Remove a staged object
    pub async fn delete_staged(&self, staged_key: &str, token: &str) -> Result<()> {
        self.client
            .request(
                Method::DELETE,
                "/files",
                RequestConfig::new().json(json!({ "fileName": staged_key })),
                Some(token),
                &format!("delete staged file {staged_key}"),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn coordinator_for(server: &MockServer) -> ImportCoordinator {
        let config = ClientConfig::builder().base_url(server.uri()).build();
        ImportCoordinator::new(ApiClient::new(Arc::new(config)).unwrap())
    }

    #[tokio::test]
    async fn test_import_plain() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/tables/s3_parquet_import"))
            .and(header("Authorization", "Bearer st_tok"))
            .and(body_json(json!({
                "table_name": "duckdb.main.students",
                "s3_key": "uploads/k.parquet"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let coordinator = coordinator_for(&mock_server);
        let table = TableRef::parse("students").unwrap();
        coordinator
            .import_plain(&table, "uploads/k.parquet", "st_tok")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_import_dedup() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/tables/s3_parquet_import_append_only_dedupe"))
            .and(body_json(json!({
                "table_name": "db.s.t",
                "s3_key": "k",
                "primary_key_columns": ["tenant", "id"]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let coordinator = coordinator_for(&mock_server);
        let table = TableRef::parse("db.s.t").unwrap();
        coordinator
            .import_dedup(
                &table,
                "k",
                &["tenant".to_string(), "id".to_string()],
                "st_tok",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_import_failure_names_table() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad parquet"))
            .mount(&mock_server)
            .await;

        let coordinator = coordinator_for(&mock_server);
        let table = TableRef::parse("students").unwrap();
        let err = coordinator
            .import_plain(&table, "k", "st_tok")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "plain import into duckdb.main.students failed with HTTP 422: bad parquet"
        );
    }

    #[tokio::test]
    async fn test_delete_staged() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/v1/files"))
            .and(body_json(json!({"fileName": "uploads/k.parquet"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let coordinator = coordinator_for(&mock_server);
        coordinator
            .delete_staged("uploads/k.parquet", "st_tok")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_staged_unauthorized_is_classified() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let coordinator = coordinator_for(&mock_server);
        let err = coordinator.delete_staged("k", "st_old").await.unwrap_err();
        assert!(err.is_unauthorized());
    }
}

//! Client facade
//!
//! [`Client`] ties the session, query executor and push pipeline together.
//! Every remote operation runs under the session's re-login wrapper.

use crate::auth::{AuthSession, Credentials};
use crate::config::ClientConfig;
use crate::engine::{PendingDeletes, PushOptions, PushPipeline, PushSummary};
use crate::error::Result;
use crate::http::ApiClient;
use crate::output::ParquetWriterConfig;
use crate::progress::{NoopObserver, ProgressObserver, TracingObserver};
use crate::query::{rewrite_placeholders, QueryExecutor};
use crate::types::{Record, TableRef, Value};
use std::sync::Arc;
use tracing::warn;

/// Client for the hosted tabular-data service
///
/// ```rust,ignore
/// use duckpush::{Client, PushOptions, Record};
///
/// let client = Client::new("access:secret:alice", false)?;
/// let rows = vec![Record::new().with("id", 1).with("name", "Alice")];
/// client.push("students", &rows, &PushOptions::new()).await?;
///
/// let found = client
///     .execute("SELECT name FROM students WHERE id = $1", &[1.into()])
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    session: AuthSession,
    queries: QueryExecutor,
    pipeline: PushPipeline,
}

impl Client {
    /// Create a client from `"accessKey:secretKey:username"` with default settings
    ///
    /// `quiet` silences progress output.
    pub fn new(credentials: &str, quiet: bool) -> Result<Self> {
        Self::with_config(credentials, ClientConfig::builder().quiet(quiet).build())
    }

    /// Create a client from a credentials string and explicit configuration
    pub fn with_config(credentials: &str, config: ClientConfig) -> Result<Self> {
        Self::from_credentials(Credentials::parse(credentials)?, config)
    }

    /// Create a client from parsed credentials
    pub fn from_credentials(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let client = ApiClient::new(Arc::clone(&config))?;

        let observer: Arc<dyn ProgressObserver> = if config.quiet {
            Arc::new(NoopObserver)
        } else {
            Arc::new(TracingObserver)
        };

        let writer_config = if config.compression {
            ParquetWriterConfig::new()
        } else {
            ParquetWriterConfig::new().uncompressed()
        };

        Ok(Self {
            session: AuthSession::new(client.clone(), credentials),
            queries: QueryExecutor::new(client.clone()),
            pipeline: PushPipeline::new(client)
                .with_observer(observer)
                .with_writer_config(writer_config),
            config,
        })
    }

    /// Report push progress to a custom observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.pipeline = self.pipeline.with_observer(observer);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Log in now instead of on first use
    pub async fn login(&self) -> Result<()> {
        self.session.login().await.map(|_| ())
    }

    /// Whether a session token is held
    pub async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    /// Resolve a table name against the configured default database and schema
    pub fn table_ref(&self, name: &str) -> Result<TableRef> {
        TableRef::parse_with_defaults(
            name,
            &self.config.default_database,
            &self.config.default_schema,
        )
    }

    /// Run SQL with `$1..$N` positional parameters and return the rows
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        // Placeholder errors must surface before login
        rewrite_placeholders(sql, params)?;

        self.session
            .ensure_authenticated(|token| async move {
                self.queries.execute(sql, params, &token).await
            })
            .await
    }

    /// Push records into `table`
    pub async fn push(&self, table: &str, records: &[Record], options: &PushOptions) -> Result<()> {
        self.push_with_summary(table, records, options)
            .await
            .map(|_| ())
    }

    /// Push records into `table` and report what was done
    ///
    /// Staged objects left behind by an attempt rejected with 401 are
    /// deleted with the next session token.
    pub async fn push_with_summary(
        &self,
        table: &str,
        records: &[Record],
        options: &PushOptions,
    ) -> Result<PushSummary> {
        let table = self.table_ref(table)?;
        self.pipeline.validate(records, options)?;

        let pending = PendingDeletes::default();
        let (table, pending) = (&table, &pending);
        let result = self
            .session
            .ensure_authenticated(|token| async move {
                self.pipeline.delete_pending(pending, &token).await?;
                self.pipeline
                    .run_tracked(table, records, options, &token, pending)
                    .await
            })
            .await;

        if !pending.is_empty().await {
            let cleanup = self
                .session
                .ensure_authenticated(|token| async move {
                    self.pipeline.delete_pending(pending, &token).await
                })
                .await;
            if let Err(e) = cleanup {
                warn!(
                    "Staged files {:?} were not deleted: {}",
                    pending.keys().await,
                    e
                );
            }
        }

        result
    }
}

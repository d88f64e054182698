//! Push pipeline
//!
//! Moves a record set into a remote table:
//!
//! ```text
//! validate → prepare table → serialize → request target → upload
//!          → import (plain | dedup) → delete staged object → remove local file
//! ```
//!
//! Stages run strictly in order. The local file and the staged object are
//! released whichever later stage failed, provided they were created. A
//! staged object whose deletion is refused with HTTP 401 is kept in
//! [`PendingDeletes`] and deleted once the session has logged in again.

mod types;

#[cfg(test)]
mod tests;

pub use types::{PushOptions, PushSummary};

use crate::error::Result;
use crate::http::ApiClient;
use crate::import::ImportCoordinator;
use crate::output::{write_staged_file, ParquetWriterConfig, StagedFile};
use crate::progress::{ImportMode, NoopObserver, ProgressObserver, PushStage};
use crate::staging::{staging_file_name, StagingUploader};
use crate::table::TableManager;
use crate::types::{Record, TableRef};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Staged objects whose deletion was refused for an expired session token
#[derive(Debug, Default)]
pub struct PendingDeletes {
    keys: Mutex<Vec<String>>,
}

impl PendingDeletes {
    /// Remember a staged key for a later delete
    pub async fn push(&self, key: impl Into<String>) {
        self.keys.lock().await.push(key.into());
    }

    /// Keys still waiting for deletion
    pub async fn keys(&self) -> Vec<String> {
        self.keys.lock().await.clone()
    }

    /// Whether nothing is waiting
    pub async fn is_empty(&self) -> bool {
        self.keys.lock().await.is_empty()
    }

    async fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.keys.lock().await)
    }
}

/// Orchestrates a push
#[derive(Clone)]
pub struct PushPipeline {
    client: ApiClient,
    tables: TableManager,
    uploader: StagingUploader,
    imports: ImportCoordinator,
    writer_config: ParquetWriterConfig,
    observer: Arc<dyn ProgressObserver>,
}

impl PushPipeline {
    /// Create a pipeline over the given channel
    pub fn new(client: ApiClient) -> Self {
        Self {
            tables: TableManager::new(client.clone()),
            uploader: StagingUploader::new(client.clone()),
            imports: ImportCoordinator::new(client.clone()),
            client,
            writer_config: ParquetWriterConfig::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Report progress to `observer`
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Override Parquet writer settings
    #[must_use]
    pub fn with_writer_config(mut self, config: ParquetWriterConfig) -> Self {
        self.writer_config = config;
        self
    }

    /// Check a push request without touching the network
    pub fn validate(&self, records: &[Record], options: &PushOptions) -> Result<()> {
        options.validate(records)
    }

    /// Run the whole pipeline with a session token
    ///
    /// Staged objects that could not be deleted because the token was
    /// rejected are only logged; use [`run_tracked`](Self::run_tracked) to
    /// delete them after a re-login.
    pub async fn run(
        &self,
        table: &TableRef,
        records: &[Record],
        options: &PushOptions,
        token: &str,
    ) -> Result<PushSummary> {
        let pending = PendingDeletes::default();
        let result = self
            .run_tracked(table, records, options, token, &pending)
            .await;
        for key in pending.keys().await {
            warn!("Staged file {} was not deleted: session token rejected", key);
        }
        result
    }

    /// Run the whole pipeline, recording undeleted staged keys in `pending`
    pub async fn run_tracked(
        &self,
        table: &TableRef,
        records: &[Record],
        options: &PushOptions,
        token: &str,
        pending: &PendingDeletes,
    ) -> Result<PushSummary> {
        self.validate(records, options)?;

        if options.prepares_table() {
            self.prepare_table(table, &records[0], options, token).await?;
            self.observer.on_stage(table, &PushStage::TableReady);
        }

        let staged = write_staged_file(
            records,
            &self.staging_dir(),
            &self.writer_config,
            self.client.config().batch_size,
        )?;
        self.observer.on_stage(
            table,
            &PushStage::Serialized {
                path: staged.path_buf(),
                rows: staged.rows(),
                bytes: staged.size(),
            },
        );

        let result = self
            .stage_and_import(table, &staged, options, token, pending)
            .await;

        let local = staged.path_buf();
        if let Err(e) = staged.remove() {
            warn!("Failed to remove local file {}: {}", local.display(), e);
        }
        self.observer.on_stage(table, &PushStage::CleanedUp);

        let summary = result?;
        info!(
            "Pushed {} rows into {} ({})",
            summary.rows, summary.table, summary.mode
        );
        Ok(summary)
    }

    async fn prepare_table(
        &self,
        table: &TableRef,
        sample: &Record,
        options: &PushOptions,
        token: &str,
    ) -> Result<()> {
        self.tables.ensure_database_and_schema(table, token).await?;
        if options.replace_if_exists {
            self.tables.replace_table(table, token).await?;
        }
        self.tables.create_table(table, sample, token).await
    }

    /// Upload the local file and import it; the staged object is deleted
    /// once the upload went through, whatever the import outcome
    async fn stage_and_import(
        &self,
        table: &TableRef,
        staged: &StagedFile,
        options: &PushOptions,
        token: &str,
        pending: &PendingDeletes,
    ) -> Result<PushSummary> {
        let file_name = staging_file_name(table);
        let target = self.uploader.request_upload_target(&file_name, token).await?;

        self.observer.on_stage(
            table,
            &PushStage::Uploading {
                key: target.key.clone(),
            },
        );
        self.uploader
            .upload(&target.presigned_url, staged.path(), Arc::clone(&self.observer))
            .await?;

        let mode = options.import_mode();
        self.observer.on_stage(table, &PushStage::Importing { mode });
        let imported = match mode {
            ImportMode::Plain => self.imports.import_plain(table, &target.key, token).await,
            ImportMode::Dedup => {
                self.imports
                    .import_dedup(table, &target.key, &options.primary_key_columns, token)
                    .await
            }
        };

        self.release_staged(&target.key, token, pending).await;
        imported?;

        self.observer
            .on_stage(table, &PushStage::Imported { rows: staged.rows() });

        Ok(PushSummary {
            table: table.clone(),
            rows: staged.rows(),
            bytes: staged.size(),
            staged_key: target.key,
            mode,
        })
    }

    /// Delete a staged object; a 401 defers it to `pending`, other
    /// failures are logged
    async fn release_staged(&self, key: &str, token: &str, pending: &PendingDeletes) {
        match self.imports.delete_staged(key, token).await {
            Ok(()) => debug!("Deleted staged file {}", key),
            Err(e) if e.is_unauthorized() => {
                debug!("Deleting staged file {} deferred until re-login", key);
                pending.push(key).await;
            }
            Err(e) => warn!("Failed to delete staged file {}: {}", key, e),
        }
    }

    /// Delete every deferred staged object with `token`
    ///
    /// Keys refused again with 401 stay pending and the 401 is returned, so
    /// the caller can log in again and retry. Other failures are logged.
    pub async fn delete_pending(&self, pending: &PendingDeletes, token: &str) -> Result<()> {
        let mut refused = None;
        for key in pending.take().await {
            match self.imports.delete_staged(&key, token).await {
                Ok(()) => debug!("Deleted deferred staged file {}", key),
                Err(e) if e.is_unauthorized() => {
                    pending.push(key).await;
                    refused = Some(e);
                }
                Err(e) => warn!("Failed to delete staged file {}: {}", key, e),
            }
        }
        refused.map_or(Ok(()), Err)
    }

    fn staging_dir(&self) -> PathBuf {
        self.client
            .config()
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

impl std::fmt::Debug for PushPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushPipeline")
            .field("client", &self.client)
            .field("writer_config", &self.writer_config)
            .finish_non_exhaustive()
    }
}

//! Push progress reporting
//!
//! The pipeline reports what it is doing through a [`ProgressObserver`].
//! The default observer logs through `tracing`; quiet clients use
//! [`NoopObserver`]. Tests plug in their own to record stages.

use crate::types::TableRef;
use std::path::PathBuf;
use tracing::{debug, info};

/// How staged rows are merged into the target table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Append all rows
    Plain,
    /// Insert only rows whose primary key is not already present
    Dedup,
}

impl std::fmt::Display for ImportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportMode::Plain => f.write_str("plain import"),
            ImportMode::Dedup => f.write_str("dedup import"),
        }
    }
}

/// A step of the push pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PushStage {
    /// Database, schema and table are in place
    TableReady,
    /// Records were written to a local Parquet file
    Serialized {
        /// Local file location
        path: PathBuf,
        /// Rows written
        rows: usize,
        /// File size in bytes
        bytes: u64,
    },
    /// The file is being uploaded under `key`
    Uploading {
        /// Staged object key
        key: String,
    },
    /// The service is importing the staged file
    Importing {
        /// Import mode
        mode: ImportMode,
    },
    /// Rows were imported
    Imported {
        /// Rows sent
        rows: usize,
    },
    /// Local and remote staged copies were cleaned up
    CleanedUp,
}

/// Receives progress notifications from a push
pub trait ProgressObserver: Send + Sync {
    /// A pipeline stage was reached
    fn on_stage(&self, table: &TableRef, stage: &PushStage) {
        let _ = (table, stage);
    }

    /// Bytes of the staged file sent so far
    fn on_upload_progress(&self, sent: u64, total: u64) {
        let _ = (sent, total);
    }
}

/// Observer that ignores all notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Observer that logs progress through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_stage(&self, table: &TableRef, stage: &PushStage) {
        match stage {
            PushStage::TableReady => info!("[{table}] table ready"),
            PushStage::Serialized { rows, bytes, .. } => {
                info!("[{table}] serialized {rows} rows ({bytes} bytes)");
            }
            PushStage::Uploading { key } => info!("[{table}] uploading {key}"),
            PushStage::Importing { mode } => info!("[{table}] running {mode}"),
            PushStage::Imported { rows } => info!("[{table}] imported {rows} rows"),
            PushStage::CleanedUp => debug!("[{table}] staged files removed"),
        }
    }

    fn on_upload_progress(&self, sent: u64, total: u64) {
        debug!("uploaded {sent}/{total} bytes");
    }
}

//! Parquet file writer
//!
//! Writes record sets to scoped temporary Parquet files for staging.

use super::schema::{arrow_schema, records_to_batch};
use crate::error::{Error, Result};
use crate::schema::infer_columns;
use crate::types::Record;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tracing::debug;

/// MIME type of the staged files
pub const PARQUET_CONTENT_TYPE: &str = "application/vnd.apache.parquet";

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024, // 1M rows
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Get row group size
    #[must_use]
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    /// Use no compression
    #[must_use]
    pub fn uncompressed(mut self) -> Self {
        self.compression = Compression::UNCOMPRESSED;
        self
    }

    /// Build writer properties
    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Parquet file writer
pub struct ParquetWriter {
    /// Arrow writer
    writer: ArrowWriter<File>,
    /// Number of rows written
    rows_written: usize,
}

impl ParquetWriter {
    /// Create a new Parquet writer over an open file
    pub fn new(file: File, schema: SchemaRef, config: &ParquetWriterConfig) -> Result<Self> {
        let props = config.build_properties();
        let writer = ArrowWriter::try_new(file, schema, Some(props)).map_err(|e| {
            Error::serialization(format!("Failed to create Parquet writer: {e}"))
        })?;

        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write a RecordBatch to the file
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        self.writer
            .write(batch)
            .map_err(|e| Error::serialization(format!("Failed to write batch: {e}")))?;

        self.rows_written += batch.num_rows();
        Ok(())
    }

    /// Get the number of rows written so far
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Close the writer, flushing all row groups
    pub fn close(self) -> Result<usize> {
        let rows = self.rows_written;
        self.writer
            .close()
            .map_err(|e| Error::serialization(format!("Failed to close Parquet writer: {e}")))?;
        Ok(rows)
    }
}

/// A Parquet file on local disk, removed when dropped
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    rows: usize,
    size: u64,
}

impl StagedFile {
    /// Location of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Owned copy of the location (stays valid after the file is removed)
    pub fn path_buf(&self) -> PathBuf {
        self.path.to_path_buf()
    }

    /// Number of rows in the file
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// File size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Remove the file, reporting failure
    pub fn remove(self) -> Result<()> {
        self.path.close().map_err(Error::Io)
    }
}

/// Serialize a record set into a new temporary Parquet file in `dir`
///
/// The schema comes from the first record. On any failure the partially
/// written file is removed before the error is returned.
pub fn write_staged_file(
    records: &[Record],
    dir: &Path,
    config: &ParquetWriterConfig,
    batch_size: usize,
) -> Result<StagedFile> {
    let sample = records
        .first()
        .ok_or_else(|| Error::serialization("No records to write"))?;
    let columns = infer_columns(sample);
    let schema = Arc::new(arrow_schema(&columns));

    let named = tempfile::Builder::new()
        .prefix("duckpush-")
        .suffix(".parquet")
        .tempfile_in(dir)
        .map_err(|e| {
            Error::serialization(format!(
                "Failed to create temporary file in {}: {e}",
                dir.display()
            ))
        })?;
    let (file, path) = named.into_parts();

    let batch_size = batch_size.max(1);
    let mut writer = ParquetWriter::new(file, schema.clone(), config)?;
    for (index, chunk) in records.chunks(batch_size).enumerate() {
        let batch = records_to_batch(chunk, &columns, schema.clone(), index * batch_size)?;
        writer.write(&batch)?;
    }
    let rows = writer.close()?;

    let size = std::fs::metadata(&path)?.len();
    debug!("Wrote {} rows ({} bytes) to {}", rows, size, path.display());

    Ok(StagedFile { path, rows, size })
}

//! Output module
//!
//! Serializes record sets into the Parquet files staged for import.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Building the Arrow schema of a record set from its sample record
//! - Converting records to Arrow RecordBatches
//! - Writing a scoped temporary Parquet file

mod schema;
mod writer;

pub use schema::{arrow_schema, records_to_batch};
pub use writer::{
    write_staged_file, ParquetWriter, ParquetWriterConfig, StagedFile, PARQUET_CONTENT_TYPE,
};

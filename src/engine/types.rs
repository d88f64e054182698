//! Push options and results

use crate::error::{Error, Result};
use crate::progress::ImportMode;
use crate::types::{Record, TableRef};
use serde::{Deserialize, Serialize};

/// How a push treats the destination table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushOptions {
    /// Create database, schema and table when missing
    pub create_if_missing: bool,
    /// Drop and re-create the table before importing
    pub replace_if_exists: bool,
    /// Skip rows whose primary key is already present
    pub dedupe_on_append: bool,
    /// Key columns for deduplication
    pub primary_key_columns: Vec<String>,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            replace_if_exists: false,
            dedupe_on_append: false,
            primary_key_columns: Vec::new(),
        }
    }
}

impl PushOptions {
    /// Defaults: create when missing, plain append
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the table's contents
    #[must_use]
    pub fn replace(mut self) -> Self {
        self.replace_if_exists = true;
        self
    }

    /// Do not create anything; the table must already exist
    #[must_use]
    pub fn no_create(mut self) -> Self {
        self.create_if_missing = false;
        self
    }

    /// Deduplicate on the given key columns
    #[must_use]
    pub fn dedupe_on<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dedupe_on_append = true;
        self.primary_key_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the pipeline sets up schema and table first
    ///
    /// Replacing always re-creates, whatever `create_if_missing` says.
    pub fn prepares_table(&self) -> bool {
        self.create_if_missing || self.replace_if_exists
    }

    /// Import mode these options select
    pub fn import_mode(&self) -> ImportMode {
        if self.dedupe_on_append {
            ImportMode::Dedup
        } else {
            ImportMode::Plain
        }
    }

    /// Check the options against the record set before any remote call
    pub fn validate(&self, records: &[Record]) -> Result<()> {
        let Some(sample) = records.first() else {
            return Err(Error::validation("cannot push an empty record set"));
        };
        if sample.is_empty() {
            return Err(Error::validation("the first record has no fields"));
        }

        if self.dedupe_on_append {
            if self.primary_key_columns.is_empty() {
                return Err(Error::validation(
                    "dedupe_on_append requires at least one primary key column",
                ));
            }
            if let Some(missing) = self
                .primary_key_columns
                .iter()
                .find(|column| !sample.contains(column))
            {
                return Err(Error::validation(format!(
                    "primary key column '{missing}' is not a field of the records"
                )));
            }
        }

        Ok(())
    }
}

/// Outcome of a successful push
#[derive(Debug, Clone, PartialEq)]
pub struct PushSummary {
    /// Destination table
    pub table: TableRef,
    /// Rows sent to the service
    pub rows: usize,
    /// Size of the staged Parquet file
    pub bytes: u64,
    /// Key the file was staged under
    pub staged_key: String,
    /// How rows were merged
    pub mode: ImportMode,
}

//! Column type inference
//!
//! Maps the values of a sample record to column types. The same
//! [`ColumnType`] yields both the SQL type used for `CREATE TABLE` and the
//! Arrow type used for the staged Parquet file, so the two never disagree.

mod inference;

pub use inference::{infer_column_type, infer_columns, Column, ColumnType};

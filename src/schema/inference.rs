//! Column type inference from sample values

use crate::types::{quote_ident, Record, Value};
use arrow::datatypes::{DataType, Field, TimeUnit};
use std::fmt;

/// Column type of a target table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 64-bit integer
    BigInt,
    /// 64-bit float
    Double,
    /// Boolean
    Boolean,
    /// Timestamp with millisecond precision, UTC
    Timestamp,
    /// Variable-length UTF-8 text
    Varchar,
}

impl ColumnType {
    /// SQL type name used in DDL
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Varchar => "VARCHAR",
        }
    }

    /// Arrow type used in the staged Parquet file
    pub fn arrow_type(self) -> DataType {
        match self {
            ColumnType::BigInt => DataType::Int64,
            ColumnType::Double => DataType::Float64,
            ColumnType::Boolean => DataType::Boolean,
            ColumnType::Timestamp => {
                DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
            }
            ColumnType::Varchar => DataType::Utf8,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_type())
    }
}

/// Infer the column type of a single value
///
/// Nulls carry no type information and fall back to `VARCHAR`. Integral
/// floats such as `5.0` stay `DOUBLE`: only [`Value::Int`] maps to
/// `BIGINT`, so a column typed from `5.0` still accepts `5.5` later.
pub fn infer_column_type(value: &Value) -> ColumnType {
    match value {
        Value::Int(_) => ColumnType::BigInt,
        Value::Float(_) => ColumnType::Double,
        Value::Bool(_) => ColumnType::Boolean,
        Value::Timestamp(_) => ColumnType::Timestamp,
        Value::Null | Value::Text(_) => ColumnType::Varchar,
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Column type
    pub column_type: ColumnType,
}

impl Column {
    /// `"name" TYPE` fragment for `CREATE TABLE`
    pub fn sql_definition(&self) -> String {
        format!("{} {}", quote_ident(&self.name), self.column_type.sql_type())
    }

    /// Nullable Arrow field for this column
    pub fn arrow_field(&self) -> Field {
        Field::new(&self.name, self.column_type.arrow_type(), true)
    }
}

/// Infer the columns of a table from its sample record, in field order
pub fn infer_columns(sample: &Record) -> Vec<Column> {
    sample
        .iter()
        .map(|(name, value)| Column {
            name: name.to_string(),
            column_type: infer_column_type(value),
        })
        .collect()
}

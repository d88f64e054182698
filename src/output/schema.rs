//! Record to Arrow conversion
//!
//! Converts records into Arrow RecordBatches following the columns inferred
//! from the sample record.

use crate::error::{Error, Result};
use crate::schema::{Column, ColumnType};
use crate::types::{Record, Value};
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Build the Arrow schema for a column list
pub fn arrow_schema(columns: &[Column]) -> Schema {
    Schema::new(columns.iter().map(Column::arrow_field).collect::<Vec<_>>())
}

/// Convert a slice of records to a RecordBatch
///
/// Every record must carry exactly the sample's field set. `first_row` is
/// the index of `records[0]` within the whole record set and is only used
/// in error messages.
pub fn records_to_batch(
    records: &[Record],
    columns: &[Column],
    schema: SchemaRef,
    first_row: usize,
) -> Result<RecordBatch> {
    for (offset, record) in records.iter().enumerate() {
        check_field_set(record, columns, first_row + offset)?;
    }

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());
    for column in columns {
        let values: Vec<&Value> = records
            .iter()
            .map(|r| r.get(&column.name).unwrap_or(&Value::Null))
            .collect();
        arrays.push(build_array(&values, column, first_row)?);
    }

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| Error::serialization(format!("Failed to create RecordBatch: {e}")))
}

/// Reject records whose fields differ from the sample's
fn check_field_set(record: &Record, columns: &[Column], row: usize) -> Result<()> {
    if let Some(missing) = columns.iter().find(|c| !record.contains(&c.name)) {
        return Err(Error::serialization(format!(
            "row {row} is missing field '{}' present in the first record",
            missing.name
        )));
    }
    if record.len() != columns.len() {
        let extra = record
            .keys()
            .find(|k| !columns.iter().any(|c| c.name == *k))
            .unwrap_or_default();
        return Err(Error::serialization(format!(
            "row {row} has field '{extra}' not present in the first record"
        )));
    }
    Ok(())
}

fn mismatch(column: &Column, row: usize, value: &Value) -> Error {
    Error::serialization(format!(
        "row {row}: field '{}' expects {}, got {value:?}",
        column.name, column.column_type
    ))
}

/// Build an Arrow array for one column
fn build_array(values: &[&Value], column: &Column, first_row: usize) -> Result<ArrayRef> {
    let row = |i: usize| first_row + i;

    match column.column_type {
        ColumnType::BigInt => {
            let items = values
                .iter()
                .enumerate()
                .map(|(i, v)| match v {
                    Value::Null => Ok(None),
                    Value::Int(n) => Ok(Some(*n)),
                    other => Err(mismatch(column, row(i), other)),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Arc::new(Int64Array::from(items)))
        }

        ColumnType::Double => {
            #[allow(clippy::cast_precision_loss)]
            let items = values
                .iter()
                .enumerate()
                .map(|(i, v)| match v {
                    Value::Null => Ok(None),
                    Value::Float(f) => Ok(Some(*f)),
                    Value::Int(n) => Ok(Some(*n as f64)),
                    other => Err(mismatch(column, row(i), other)),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Arc::new(Float64Array::from(items)))
        }

        ColumnType::Boolean => {
            let items = values
                .iter()
                .enumerate()
                .map(|(i, v)| match v {
                    Value::Null => Ok(None),
                    Value::Bool(b) => Ok(Some(*b)),
                    other => Err(mismatch(column, row(i), other)),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Arc::new(BooleanArray::from(items)))
        }

        ColumnType::Timestamp => {
            let items = values
                .iter()
                .enumerate()
                .map(|(i, v)| match v {
                    Value::Null => Ok(None),
                    Value::Timestamp(ts) => Ok(Some(ts.timestamp_millis())),
                    other => Err(mismatch(column, row(i), other)),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Arc::new(
                TimestampMillisecondArray::from(items).with_timezone("UTC"),
            ))
        }

        ColumnType::Varchar => {
            let items: Vec<Option<String>> = values
                .iter()
                .map(|v| match v {
                    Value::Null => None,
                    Value::Text(s) => Some(s.clone()),
                    Value::Int(n) => Some(n.to_string()),
                    Value::Float(f) => Some(f.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    Value::Timestamp(ts) => Some(ts.to_rfc3339()),
                })
                .collect();
            Ok(Arc::new(StringArray::from(items)))
        }
    }
}

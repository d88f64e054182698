//! Common types used throughout duckpush
//!
//! This module contains the cell value model, records, and the
//! three-part table reference shared by every stage of the pipeline.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Cell Values
// ============================================================================

/// A single scalar cell value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing value
    #[default]
    Null,
    /// Integral number
    Int(i64),
    /// Non-integral number
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Point in time
    Timestamp(DateTime<Utc>),
    /// Text (and anything without a more specific type)
    Text(String),
}

impl Value {
    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert a JSON value into a cell value
    ///
    /// Nested arrays and objects are kept as their JSON text.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Text(n.to_string()), Value::Float),
            },
            JsonValue::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Convert into a JSON value (timestamps become RFC 3339 strings)
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(JsonValue::Null, JsonValue::Number),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Timestamp(ts) => JsonValue::String(ts.to_rfc3339()),
            Value::Text(s) => JsonValue::String(s.clone()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ============================================================================
// Records
// ============================================================================

/// An ordered mapping of field name to value
///
/// Field order is insertion order; the first record of a push defines the
/// column order of the target table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field, keeping the original position on replace
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Check whether a field is present
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate over (name, value) pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from a JSON object
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(obj) => Ok(Self::from_json_object(obj)),
            other => Err(Error::validation(format!(
                "expected a JSON object for a record, got: {other}"
            ))),
        }
    }

    /// Build a record from a JSON object map
    pub fn from_json_object(obj: &JsonObject) -> Self {
        obj.iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect()
    }

    /// Convert into a JSON object
    pub fn to_json(&self) -> JsonValue {
        let obj: JsonObject = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        JsonValue::Object(obj)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ============================================================================
// Table Reference
// ============================================================================

/// Database used when a bare table name is given
pub const DEFAULT_DATABASE: &str = "duckdb";

/// Schema used when a bare table name is given
pub const DEFAULT_SCHEMA: &str = "main";

/// A fully qualified `database.schema.table` name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    database: String,
    schema: String,
    table: String,
}

impl TableRef {
    /// Create a table reference from its three parts
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Parse a table name, expanding bare names to `duckdb.main.<name>`
    pub fn parse(name: &str) -> Result<Self> {
        Self::parse_with_defaults(name, DEFAULT_DATABASE, DEFAULT_SCHEMA)
    }

    /// Parse a table name, expanding bare names with the given prefix
    ///
    /// Exactly one or exactly three non-empty dot-separated segments are
    /// accepted.
    pub fn parse_with_defaults(name: &str, database: &str, schema: &str) -> Result<Self> {
        let parts: Vec<&str> = name.trim().split('.').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::validation(format!(
                "invalid table name '{name}': empty segment"
            )));
        }
        match parts.as_slice() {
            [table] => Ok(Self::new(database, schema, *table)),
            [db, sch, table] => Ok(Self::new(*db, *sch, *table)),
            _ => Err(Error::validation(format!(
                "invalid table name '{name}': expected 'table' or 'database.schema.table', got {} segments",
                parts.len()
            ))),
        }
    }

    /// Database segment
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Schema segment
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Table segment
    pub fn table(&self) -> &str {
        &self.table
    }

    /// `"database"."schema"` for DDL
    pub fn quoted_schema(&self) -> String {
        format!("{}.{}", quote_ident(&self.database), quote_ident(&self.schema))
    }

    /// `"database"."schema"."table"` for DDL
    pub fn quoted(&self) -> String {
        format!("{}.{}", self.quoted_schema(), quote_ident(&self.table))
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.table)
    }
}

impl std::str::FromStr for TableRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Double-quote an SQL identifier, escaping embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("students", "duckdb.main.students" ; "bare name expands")]
    #[test_case("db.sch.tbl", "db.sch.tbl" ; "three parts kept")]
    #[test_case("  events ", "duckdb.main.events" ; "whitespace trimmed")]
    fn test_table_ref_accepts(input: &str, expected: &str) {
        assert_eq!(TableRef::parse(input).unwrap().to_string(), expected);
    }

    #[test_case("a.b" ; "two segments")]
    #[test_case("a.b.c.d" ; "four segments")]
    #[test_case("" ; "empty")]
    #[test_case("a..c" ; "empty middle")]
    #[test_case(".t" ; "leading dot")]
    fn test_table_ref_rejects(input: &str) {
        let err = TableRef::parse(input).unwrap_err();
        assert!(err.is_validation(), "{err}");
    }

    #[test]
    fn test_table_ref_custom_defaults() {
        let t = TableRef::parse_with_defaults("t", "analytics", "raw").unwrap();
        assert_eq!(t.database(), "analytics");
        assert_eq!(t.schema(), "raw");
        assert_eq!(t.table(), "t");
    }

    #[test]
    fn test_table_ref_quoted() {
        let t = TableRef::new("db", "main", "we\"ird");
        assert_eq!(t.quoted_schema(), "\"db\".\"main\"");
        assert_eq!(t.quoted(), "\"db\".\"main\".\"we\"\"ird\"");
    }

    #[test]
    fn test_record_preserves_insertion_order() {
        let record = Record::new()
            .with("zeta", 1)
            .with("alpha", "a")
            .with("mid", true);
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_record_insert_replaces_in_place() {
        let mut record = Record::new().with("a", 1).with("b", 2);
        record.insert("a", 10);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("a"), Some(&Value::Int(10)));
        assert_eq!(record.keys().next(), Some("a"));
    }

    #[test]
    fn test_record_from_json() {
        let record =
            Record::from_json(&json!({"id": 1, "score": 2.5, "ok": false, "name": null}))
                .unwrap();
        assert_eq!(record.get("id"), Some(&Value::Int(1)));
        assert_eq!(record.get("score"), Some(&Value::Float(2.5)));
        assert_eq!(record.get("ok"), Some(&Value::Bool(false)));
        assert_eq!(record.get("name"), Some(&Value::Null));
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["id", "score", "ok", "name"]);
    }

    #[test]
    fn test_record_from_json_rejects_non_object() {
        assert!(Record::from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_record_serializes_as_map() {
        let record = Record::new().with("id", 7).with("name", "x");
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"id":7,"name":"x"}"#);
    }

    #[test]
    fn test_value_timestamp_to_json() {
        let ts = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            Value::from(ts).to_json(),
            json!("2024-01-02T03:04:05+00:00")
        );
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }
}

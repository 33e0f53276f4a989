//! Common types used across rowdump

use crate::error::{Result, RowdumpError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One fetched row: field names mapped to scalar values.
///
/// Fields keep the order in which the source sent them. Within one export
/// every record is expected to carry the same fields, in the same order, as
/// the first record; encoders rely on this and do not re-check it.
///
/// # Examples
///
/// ```rust
/// use rowdump_common::Record;
///
/// let record = Record::new().with_field("id", 7).with_field("name", "Ada");
/// assert_eq!(record.keys().collect::<Vec<_>>(), vec!["id", "name"]);
/// assert_eq!(record.field_text("id"), "7");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a record from a decoded JSON row
    ///
    /// Only JSON objects are rows; anything else is a parse error.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(RowdumpError::parse(format!(
                "expected a JSON object per record, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Append a field, builder style
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a field, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Field names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Field values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text form of a field, or an empty string when the field is absent
    pub fn field_text(&self, key: &str) -> String {
        self.0.get(key).map(scalar_to_string).unwrap_or_default()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Render a JSON value the way it appears in delimited output
///
/// Strings are written verbatim, numbers and booleans use their JSON text,
/// `null` becomes an empty field, and nested arrays or objects are written
/// as compact JSON.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_keeps_source_order() {
        let record = Record::from_value(json!({"zeta": 1, "alpha": 2, "mid": 3})).unwrap();
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        let err = Record::from_value(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, RowdumpError::Parse(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_field_text() {
        let record = Record::from_value(json!({
            "id": 42,
            "name": "Item 42",
            "value": 0.12,
            "active": true,
            "deleted_at": null,
            "tags": ["a", "b"]
        }))
        .unwrap();

        assert_eq!(record.field_text("id"), "42");
        assert_eq!(record.field_text("name"), "Item 42");
        assert_eq!(record.field_text("value"), "0.12");
        assert_eq!(record.field_text("active"), "true");
        assert_eq!(record.field_text("deleted_at"), "");
        assert_eq!(record.field_text("tags"), r#"["a","b"]"#);
        assert_eq!(record.field_text("missing"), "");
    }

    #[test]
    fn test_deserialize_page_of_rows() {
        let rows: Vec<Record> =
            serde_json::from_str(r#"[{"id":1,"name":"a"},{"id":2,"name":"b"}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].field_text("name"), "b");
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut record = Record::new().with_field("a", 1).with_field("b", 2);
        let previous = record.insert("a", 10);
        assert_eq!(previous, Some(json!(1)));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(record.len(), 2);
    }
}

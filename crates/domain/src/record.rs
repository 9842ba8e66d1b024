//! `Record`: the ordered key/value payload accepted by the pipeline.

use otlp_relay_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved record keys with pipeline-defined meaning.
pub const RESERVED_KEYS: &[&str] = &[
    "message",
    "severityText",
    "severityNumber",
    "service.name",
    "service.version",
    "traceId",
    "spanId",
    "error",
];

/// Reserved keys extracted into the `LogRecord` skeleton (severity, trace
/// linkage, resource grouping) rather than forwarded into the OTLP body.
/// `message` and `error` are reserved but not skeleton fields: they still
/// flow into the body's key/value list alongside ordinary attributes.
const SKELETON_KEYS: &[&str] = &[
    "severityText",
    "severityNumber",
    "service.name",
    "service.version",
    "traceId",
    "spanId",
];

/// An ordered mapping of record fields.
///
/// Backed by `serde_json::Map`, which preserves insertion order because the
/// workspace enables serde_json's `preserve_order` feature. Order matters:
/// the mapper must forward non-reserved attributes into the OTLP body in the
/// same order they were inserted into the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a record from a JSON value, rejecting anything but an object.
    pub fn from_json(value: Value) -> Result<Self, ErrorEnvelope> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("record must be a JSON object, got {other}"),
            )),
        }
    }

    /// Insert or overwrite a field, preserving first-insertion order for new
    /// keys (matching `serde_json::Map`'s `IndexMap`-backed semantics).
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Borrow a field by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrow a field as a string, if present and of string type.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Iterate non-reserved ("attribute") fields in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
    }

    /// Iterate the fields that form the OTLP body: `message`, `error`, and
    /// every ordinary attribute, in insertion order. Excludes only the keys
    /// extracted into the `LogRecord` skeleton or the resource grouping.
    pub fn body_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0
            .iter()
            .filter(|(key, _)| !SKELETON_KEYS.contains(&key.as_str()))
    }

    /// `service.name`, defaulting to `"unknown"` per the mapper's grouping
    /// rule when absent or not a string.
    #[must_use]
    pub fn service_name(&self) -> &str {
        self.get_str("service.name").unwrap_or("unknown")
    }

    /// `service.version`, defaulting to `"0.0.0-unknown"`.
    #[must_use]
    pub fn service_version(&self) -> &str {
        self.get_str("service.version").unwrap_or("0.0.0-unknown")
    }

    /// The record's `message` field, if present.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.get_str("message")
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Object(record.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preserves_insertion_order_for_attributes() {
        let mut record = Record::new();
        record.insert("message", "hello");
        record.insert("z_attr", 1);
        record.insert("a_attr", 2);

        let names: Vec<&str> = record.attributes().map(|(key, _)| key.as_str()).collect();
        assert_eq!(names, vec!["z_attr", "a_attr"]);
    }

    #[test]
    fn rejects_non_object_json() {
        let result = Record::from_json(json!([1, 2, 3]));
        assert!(result.is_err());
    }

    #[test]
    fn defaults_service_fields() {
        let record = Record::new();
        assert_eq!(record.service_name(), "unknown");
        assert_eq!(record.service_version(), "0.0.0-unknown");
    }
}

//! OTLP/HTTP JSON wire DTOs.
//!
//! Mirrors the JSON mapping of the OTLP logs protobuf message, restricted to
//! the fields this pipeline populates. Field names use the protobuf JSON
//! mapping's camelCase convention.

use serde::{Deserialize, Serialize};

/// The OTLP schema URL this exporter declares for every resource.
pub const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.30.0";

/// The instrumentation scope name this exporter reports.
pub const SCOPE_NAME: &str = "otlp-relay";

/// The instrumentation scope version this exporter reports.
pub const SCOPE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A recursive, discriminated OTLP attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnyValue {
    /// `stringValue`.
    #[serde(rename_all = "camelCase")]
    StringValue {
        /// The string payload.
        string_value: String,
    },
    /// `boolValue`.
    #[serde(rename_all = "camelCase")]
    BoolValue {
        /// The boolean payload.
        bool_value: bool,
    },
    /// `intValue`, encoded as a JSON string per the OTLP/HTTP JSON mapping
    /// for 64-bit integers.
    #[serde(rename_all = "camelCase")]
    IntValue {
        /// The integer payload, as a decimal string.
        int_value: String,
    },
    /// `doubleValue`.
    #[serde(rename_all = "camelCase")]
    DoubleValue {
        /// The double payload.
        double_value: f64,
    },
    /// `arrayValue`.
    #[serde(rename_all = "camelCase")]
    ArrayValue {
        /// The nested array payload.
        array_value: ArrayValue,
    },
    /// `kvlistValue`.
    #[serde(rename_all = "camelCase")]
    KvlistValue {
        /// The nested key/value list payload.
        kvlist_value: KeyValueList,
    },
}

impl AnyValue {
    /// Wrap a string.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::StringValue {
            string_value: value.into(),
        }
    }

    /// Wrap a boolean.
    #[must_use]
    pub const fn bool(value: bool) -> Self {
        Self::BoolValue { bool_value: value }
    }

    /// Wrap a 64-bit integer.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::IntValue {
            int_value: value.to_string(),
        }
    }

    /// Wrap a double.
    #[must_use]
    pub const fn double(value: f64) -> Self {
        Self::DoubleValue {
            double_value: value,
        }
    }

    /// Wrap an array of values.
    #[must_use]
    pub const fn array(values: Vec<Self>) -> Self {
        Self::ArrayValue {
            array_value: ArrayValue { values },
        }
    }

    /// Wrap a nested key/value list.
    #[must_use]
    pub const fn kvlist(values: Vec<KeyValue>) -> Self {
        Self::KvlistValue {
            kvlist_value: KeyValueList { values },
        }
    }
}

/// `ArrayValue`: an ordered list of `AnyValue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    /// Array elements, in order.
    pub values: Vec<AnyValue>,
}

/// A single OTLP key/value attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Attribute key.
    pub key: String,
    /// Attribute value.
    pub value: AnyValue,
}

impl KeyValue {
    /// Construct a key/value pair.
    pub fn new(key: impl Into<String>, value: AnyValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// `KeyValueList`: an ordered list of key/value attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValueList {
    /// Key/value pairs, in order.
    pub values: Vec<KeyValue>,
}

/// A single OTLP log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Nanoseconds since the Unix epoch when the event occurred, as a
    /// decimal string per the OTLP/HTTP JSON `fixed64` mapping.
    pub time_unix_nano: String,
    /// Nanoseconds since the Unix epoch when the record was observed by
    /// this exporter (i.e. mapping time).
    pub observed_time_unix_nano: String,
    /// Numeric severity, per the OTLP `SeverityNumber` enum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_number: Option<u32>,
    /// Human-readable severity name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_text: Option<String>,
    /// The record's body: a `kvlistValue` of `message`, `error`, and every
    /// ordinary attribute, in insertion order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<AnyValue>,
    /// Trace id, hex-encoded, when present on the source record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Span id, hex-encoded, when present on the source record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
}

/// `ScopeLogs`: one instrumentation scope's log records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeLogs {
    /// The instrumentation scope.
    pub scope: InstrumentationScope,
    /// Records produced under this scope, in input order.
    pub log_records: Vec<LogRecord>,
}

/// `InstrumentationScope`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentationScope {
    /// Scope name.
    pub name: String,
    /// Scope version.
    pub version: String,
}

impl Default for InstrumentationScope {
    fn default() -> Self {
        Self {
            name: SCOPE_NAME.to_owned(),
            version: SCOPE_VERSION.to_owned(),
        }
    }
}

/// `Resource`: the resource attributes for one (service.name, service.version) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource attributes (always includes `service.name`/`service.version`).
    pub attributes: Vec<KeyValue>,
}

/// `ResourceLogs`: one resource's grouped scope logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLogs {
    /// The resource these logs belong to.
    pub resource: Resource,
    /// Scope logs under this resource.
    pub scope_logs: Vec<ScopeLogs>,
    /// Schema URL for the resource.
    pub schema_url: String,
}

/// The top-level OTLP/HTTP export request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportLogsServiceRequest {
    /// Grouped resource logs, one per distinct (service.name, service.version).
    pub resource_logs: Vec<ResourceLogs>,
}

/// The OTLP/HTTP export response body, used to detect partial success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExportLogsServiceResponse {
    /// Present when the collector accepted the batch but rejected some records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_success: Option<ExportLogsPartialSuccess>,
}

/// `ExportLogsPartialSuccess`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExportLogsPartialSuccess {
    /// Number of log records rejected by the server.
    #[serde(default)]
    pub rejected_log_records: i64,
    /// Human-readable explanation of the rejection.
    #[serde(default)]
    pub error_message: String,
}

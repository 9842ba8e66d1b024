//! Pure mapping from records to an OTLP/HTTP export request.

use crate::wire::{
    AnyValue, ExportLogsServiceRequest, InstrumentationScope, KeyValue, LogRecord, Resource,
    ResourceLogs, SCHEMA_URL, ScopeLogs,
};
use otlp_relay_domain::{Record, Severity};
use otlp_relay_ports::LoggerPort;
use serde_json::Value;
use std::collections::HashMap;

/// Map a slice of records into an OTLP/HTTP export request.
///
/// `now_unix_nanos` is used as both `timeUnixNano` and
/// `observedTimeUnixNano` for every record in this batch: this mapper has no
/// access to a clock of its own, so "observed at mapping time" means
/// precisely the instant the caller passed in.
///
/// Records are grouped by `(service.name, service.version)` (each defaulted
/// per [`Record::service_name`]/[`Record::service_version`] when absent),
/// preserving the order each group was first seen in `records`. Within a
/// group, `logRecords` preserve the input order of `records`.
///
/// Any attribute value this mapper cannot represent as an `AnyValue` (only
/// `null` today — every other JSON type has a direct mapping) is dropped and
/// reported once per occurrence to `fallback`, per the mapper's
/// drop-and-report contract.
#[must_use]
pub fn map_records(
    records: &[Record],
    now_unix_nanos: u64,
    fallback: &dyn LoggerPort,
) -> ExportLogsServiceRequest {
    let mut group_order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), Vec<LogRecord>> = HashMap::new();

    for record in records {
        let key = (
            record.service_name().to_owned(),
            record.service_version().to_owned(),
        );
        if !groups.contains_key(&key) {
            group_order.push(key.clone());
        }
        let log_record = map_one_record(record, now_unix_nanos, fallback);
        groups.entry(key).or_default().push(log_record);
    }

    let resource_logs = group_order
        .into_iter()
        .map(|key| {
            let log_records = groups.remove(&key).unwrap_or_default();
            let (service_name, service_version) = key;
            ResourceLogs {
                resource: Resource {
                    attributes: vec![
                        KeyValue::new("service.name", AnyValue::string(service_name)),
                        KeyValue::new("service.version", AnyValue::string(service_version)),
                    ],
                },
                scope_logs: vec![ScopeLogs {
                    scope: InstrumentationScope::default(),
                    log_records,
                }],
                schema_url: SCHEMA_URL.to_owned(),
            }
        })
        .collect();

    ExportLogsServiceRequest { resource_logs }
}

fn map_one_record(record: &Record, now_unix_nanos: u64, fallback: &dyn LoggerPort) -> LogRecord {
    let (severity_number, severity_text) = resolve_severity(record);

    let mut body_values = Vec::new();
    for (key, value) in record.body_fields() {
        match json_to_any_value(value) {
            Some(any_value) => body_values.push(KeyValue::new(key.clone(), any_value)),
            None => {
                fallback.warn(
                    "otlp.mapper.dropped_attribute",
                    "dropped a record attribute the mapper cannot represent",
                    None,
                );
            },
        }
    }
    let body = Some(AnyValue::kvlist(body_values));

    LogRecord {
        time_unix_nano: now_unix_nanos.to_string(),
        observed_time_unix_nano: now_unix_nanos.to_string(),
        severity_number,
        severity_text,
        body,
        trace_id: record.get_str("traceId").map(str::to_owned),
        span_id: record.get_str("spanId").map(str::to_owned),
    }
}

fn resolve_severity(record: &Record) -> (Option<u32>, Option<String>) {
    let name = record.get_str("severityText");
    let number = record
        .get("severityNumber")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok());

    match (name, number) {
        (Some(name), Some(number)) => match Severity::from_name_and_number(name, number) {
            Ok(severity) => (Some(severity.number()), Some(severity.name().to_owned())),
            Err(_) => (Some(number), Some(name.to_owned())),
        },
        (Some(name), None) => Severity::parse_name(name)
            .map(|severity| (Some(severity.number()), Some(severity.name().to_owned())))
            .unwrap_or((None, Some(name.to_owned()))),
        (None, Some(number)) => Severity::from_number(number)
            .map(|severity| (Some(severity.number()), Some(severity.name().to_owned())))
            .unwrap_or((Some(number), None)),
        (None, None) => (None, None),
    }
}

/// Convert a JSON value into an OTLP `AnyValue`. Returns `None` for `null`,
/// which has no OTLP representation.
fn json_to_any_value(value: &Value) -> Option<AnyValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(AnyValue::bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(AnyValue::int(i))
            } else {
                Some(AnyValue::double(n.as_f64().unwrap_or_default()))
            }
        },
        Value::String(s) => Some(AnyValue::string(s.clone())),
        Value::Array(items) => {
            let mapped: Vec<AnyValue> = items.iter().filter_map(json_to_any_value).collect();
            Some(AnyValue::array(mapped))
        },
        Value::Object(map) => {
            let mapped: Vec<KeyValue> = map
                .iter()
                .filter_map(|(key, value)| {
                    json_to_any_value(value).map(|any_value| KeyValue::new(key.clone(), any_value))
                })
                .collect();
            Some(AnyValue::kvlist(mapped))
        },
    }
}

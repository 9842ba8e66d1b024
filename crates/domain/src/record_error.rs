//! `RecordError`: the JSON-serializable error object embedded under a
//! record's reserved `error` key.
//!
//! This is distinct from `otlp_relay_shared::ErrorEnvelope`: the envelope is
//! the crate's internal control-flow error type, while `RecordError` is a
//! value that becomes part of a record's payload and is forwarded into the
//! OTLP body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured error value suitable for embedding in a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordError {
    /// Short, stable error name (e.g. `"ValidationError"`).
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Free-form context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// The error that caused this one, recursively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<RecordError>>,
    /// True when this represents a programming invariant violation rather
    /// than an expected failure.
    #[serde(default)]
    pub bug: bool,
}

impl RecordError {
    /// Construct a plain error with no context, cause, or bug flag.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            context: None,
            cause: None,
            bug: false,
        }
    }

    /// Attach free-form context.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Attach an underlying cause.
    #[must_use]
    pub fn with_cause(mut self, cause: Self) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Mark this error as representing a bug.
    #[must_use]
    pub const fn as_bug(mut self) -> Self {
        self.bug = true;
        self
    }
}

impl From<otlp_relay_shared::ErrorEnvelope> for RecordError {
    fn from(envelope: otlp_relay_shared::ErrorEnvelope) -> Self {
        let mut context = serde_json::Map::new();
        context.insert("code".to_owned(), Value::String(envelope.code.to_string()));
        context.insert(
            "class".to_owned(),
            Value::String(envelope.class.to_string()),
        );
        for (key, value) in &envelope.metadata {
            context.insert(key.clone(), Value::String(value.clone()));
        }

        let cause = envelope.cause.map(|cause| Box::new(Self::from(*cause)));
        Self {
            name: envelope.code.to_string(),
            message: envelope.message,
            context: Some(Value::Object(context)),
            cause,
            bug: matches!(envelope.kind, otlp_relay_shared::ErrorKind::Invariant),
        }
    }
}

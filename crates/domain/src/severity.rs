//! Severity: the record's log level, as both a name and a number.

use otlp_relay_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};

/// A record's severity, matching the OTLP `SeverityNumber` ranges.
///
/// Reserved record keys `severityText` (name) and `severityNumber` (int) must be
/// mutually consistent when both are present; [`Severity::from_name_and_number`]
/// enforces that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Fine-grained diagnostic information.
    Debug,
    /// Something unexpected, not yet an error.
    Warn,
    /// An unrecoverable condition.
    Fatal,
}

impl Severity {
    /// The `severityNumber` OTLP assigns to this severity's lower bound.
    #[must_use]
    pub const fn number(self) -> u32 {
        match self {
            Self::Debug => 5,
            Self::Warn => 13,
            Self::Fatal => 21,
        }
    }

    /// The lowercase `severityText` name OTLP expects.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Warn => "warn",
            Self::Fatal => "fatal",
        }
    }

    /// Parse a severity name (case-insensitive).
    pub fn parse_name(name: &str) -> Result<Self, ErrorEnvelope> {
        match name.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "warn" | "warning" => Ok(Self::Warn),
            "fatal" | "error" => Ok(Self::Fatal),
            other => Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("unrecognized severity name: {other}"),
            )),
        }
    }

    /// Map a `severityNumber` onto one of the three buckets, using the same
    /// range semantics as the OTLP spec (5-12 debug, 13-20 warn, 21+ fatal).
    pub fn from_number(number: u32) -> Result<Self, ErrorEnvelope> {
        match number {
            5..=12 => Ok(Self::Debug),
            13..=20 => Ok(Self::Warn),
            21..=24 => Ok(Self::Fatal),
            other => Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("severityNumber {other} is out of the supported range"),
            )),
        }
    }

    /// Validate that an explicit name and number agree, returning the
    /// resolved severity. An invariant error is returned when they disagree.
    pub fn from_name_and_number(name: &str, number: u32) -> Result<Self, ErrorEnvelope> {
        let from_name = Self::parse_name(name)?;
        let from_number = Self::from_number(number)?;
        if from_name != from_number {
            return Err(ErrorEnvelope::invariant(
                ErrorCode::new("domain", "severity_mismatch"),
                format!("severity name {name:?} does not match severityNumber {number}"),
            ));
        }
        Ok(from_name)
    }
}

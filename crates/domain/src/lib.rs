//! # otlp-relay-domain
//!
//! Domain entities for the telemetry pipeline.
//!
//! This crate contains the core domain model with no infrastructure dependencies:
//!
//! - **Record** - the ordered key/value payload accepted by the pipeline
//! - **Severity** - a record's log level, as name and number
//! - **RecordError** - the JSON-serializable error object embedded in records
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use otlp_relay_shared::shared_crate_version;

pub mod record;
pub mod record_error;
pub mod severity;

pub use record::{RESERVED_KEYS, Record};
pub use record_error::RecordError;
pub use severity::Severity;

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_crate_compiles() {
        let version = domain_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn domain_depends_on_shared() {
        let shared_version = shared_crate_version();
        assert!(!shared_version.is_empty());
    }
}

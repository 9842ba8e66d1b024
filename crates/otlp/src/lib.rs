//! # otlp-relay-otlp
//!
//! OTLP/HTTP JSON wire model and the pure records-to-export-request mapper.
//! This crate depends on `domain`, `ports` (for the fallback-sink logger
//! port), and `shared`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod mapper;
pub mod wire;

pub use mapper::map_records;
pub use wire::*;

/// Returns the otlp crate version.
#[must_use]
pub const fn otlp_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! # otlp-relay-adapters
//!
//! Concrete implementations of the `ports` traits: a JSON logger and
//! telemetry sink, two queue backends, and an HTTP export transport. This
//! crate depends on `ports`, `shared`, and `domain`.

pub mod log_sink;
pub mod logger;
pub mod otlp_http;
pub mod queue;
pub mod telemetry;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

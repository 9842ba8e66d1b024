//! # otlp-relay-app
//!
//! Application use cases: the batching exporter loop and the producer-side
//! enqueue/dispatch path. This crate depends on `ports`, `domain`, and
//! `shared`.

pub mod batching_exporter;
pub mod producer;

pub use batching_exporter::{BatchingExporter, BatchingExporterConfig};
pub use producer::{DispatchDeps, DispatchOutcome, dispatch, enqueue_with_retry};

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use otlp_relay_domain::domain_crate_version;
    use otlp_relay_ports::ports_crate_version;
    use otlp_relay_shared::shared_crate_version;

    #[test]
    fn app_crate_compiles() {
        let version = app_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn app_can_use_ports_domain_shared() {
        let ports_version = ports_crate_version();
        let domain_version = domain_crate_version();
        let shared_version = shared_crate_version();

        assert!(!ports_version.is_empty());
        assert!(!domain_version.is_empty());
        assert!(!shared_version.is_empty());
    }
}

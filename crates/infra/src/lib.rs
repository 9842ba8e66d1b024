//! # otlp-relay-infra
//!
//! Infrastructure wiring and runtime composition: this crate maps
//! `otlp-relay-config` settings onto concrete `otlp-relay-adapters` behind
//! `otlp-relay-ports` trait objects, and exposes the composition helpers
//! consumed by the CLI and by integration tests. This crate depends on
//! `app`, `adapters`, `config`, and `shared`.

use otlp_relay_adapters::log_sink::StderrLogSink;
use otlp_relay_adapters::logger::{JsonLogger, TeeingLogger};
use otlp_relay_adapters::otlp_http::HttpExportTransport;
use otlp_relay_adapters::queue::{InMemoryQueue, SqliteQueue};
use otlp_relay_adapters::telemetry::JsonTelemetry;
use otlp_relay_app::{BatchingExporter, BatchingExporterConfig};
use otlp_relay_config::{ExporterSettings, LoggingSettings, QueueBackend, QueueSettings};
use otlp_relay_ports::{LogLevel, LoggerPort, QueuePort, TelemetryPort};
use otlp_relay_shared::{RequestContext, Result};
use std::sync::Arc;
use std::time::Duration;

/// Build a [`QueuePort`] from settings: an in-memory queue, or a
/// `SQLite`-backed durable queue opened at the configured path.
pub fn build_queue(settings: &QueueSettings) -> Result<Arc<dyn QueuePort>> {
    match &settings.backend {
        QueueBackend::Memory => Ok(Arc::new(InMemoryQueue::new())),
        QueueBackend::Durable { path } => {
            let queue = SqliteQueue::open(path.as_ref())?;
            Ok(Arc::new(queue))
        },
    }
}

/// Build a [`LoggerPort`] from logging settings. When `log_queue` is set,
/// the returned logger additionally tees every event into `queue` under
/// that binding name (`spec.md` §6.4). Debug-severity events are dropped
/// at this sink when `log_debug` is false.
pub fn build_logger(settings: &LoggingSettings, queue: &Arc<dyn QueuePort>) -> Arc<dyn LoggerPort> {
    let min_level = if settings.log_debug {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let base: Arc<dyn LoggerPort> =
        Arc::new(JsonLogger::new(Arc::new(StderrLogSink)).with_min_level(min_level));

    match &settings.log_queue {
        Some(binding) => Arc::new(TeeingLogger::new(base, Arc::clone(queue), binding.as_ref())),
        None => base,
    }
}

/// Build a [`TelemetryPort`] emitting JSON lines to stderr.
#[must_use]
pub fn build_telemetry() -> Arc<dyn TelemetryPort> {
    Arc::new(JsonTelemetry::new(Arc::new(StderrLogSink)))
}

/// Build the batching exporter from settings and its already-built
/// dependencies.
pub fn build_exporter(
    settings: &ExporterSettings,
    queue: Arc<dyn QueuePort>,
    logger: Arc<dyn LoggerPort>,
    telemetry: Arc<dyn TelemetryPort>,
) -> Result<BatchingExporter> {
    let transport = Arc::new(HttpExportTransport::new(request_timeout(settings))?);

    Ok(BatchingExporter::new(
        queue,
        transport,
        logger,
        telemetry,
        BatchingExporterConfig {
            batch_size: usize::try_from(settings.batch_size).unwrap_or(usize::MAX),
            full_batch_timeout: Duration::from_millis(settings.full_batch_timeout_ms),
            receive_timeout: Duration::from_millis(settings.receive_timeout_ms),
            soft_stop: settings.soft_stop,
            endpoint: settings.endpoint.clone(),
        },
    ))
}

/// Generous upper bound on a single export POST: long enough that the
/// HTTP client timeout never fires before the exporter's own receive
/// timeout would have moved on anyway.
fn request_timeout(settings: &ExporterSettings) -> Duration {
    Duration::from_millis(settings.full_batch_timeout_ms.max(5_000))
}

/// Run the exporter loop until `ctx`'s root scope is cancelled (e.g. on
/// Ctrl-C), performing a final flush before returning.
pub async fn run_exporter_until_cancelled(exporter: &BatchingExporter, ctx: &RequestContext) {
    exporter.run(ctx).await;
}

/// Returns the infra crate version.
#[must_use]
pub const fn infra_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use otlp_relay_adapters::adapters_crate_version;
    use otlp_relay_app::app_crate_version;
    use otlp_relay_config::config_crate_version;
    use otlp_relay_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]";
                continue;
            }
            if !in_deps {
                continue;
            }
            if line.starts_with("otlp-relay-") {
                let key = line.split('=').next().unwrap_or("").trim();
                deps.push(key.to_string());
            }
        }

        deps
    }

    #[test]
    fn infra_depends_on_app_adapters_config() {
        let deps = workspace_deps();
        let required = ["otlp-relay-app", "otlp-relay-adapters", "otlp-relay-config"];

        for expected in required {
            assert!(
                deps.iter().any(|dep| dep == expected),
                "missing dependency: {expected}"
            );
        }
    }

    #[test]
    fn infra_crate_compiles() {
        let version = infra_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn infra_can_use_app_adapters_config_shared() {
        assert!(!app_crate_version().is_empty());
        assert!(!adapters_crate_version().is_empty());
        assert!(!config_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }

    #[test]
    fn build_queue_selects_memory_backend() {
        let settings = QueueSettings {
            backend: QueueBackend::Memory,
        };
        build_queue(&settings).expect("memory queue should build");
    }

    #[test]
    fn build_queue_opens_durable_backend() {
        let dir = std::env::temp_dir().join(format!(
            "otlp-relay-infra-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("queue.db");

        let settings = QueueSettings {
            backend: QueueBackend::Durable {
                path: path.to_string_lossy().into_owned().into_boxed_str(),
            },
        };
        build_queue(&settings).expect("durable queue should open");
    }

    #[tokio::test]
    async fn build_exporter_wires_dependencies_and_runs() {
        let queue = build_queue(&QueueSettings {
            backend: QueueBackend::Memory,
        })
        .expect("queue");
        let logging = LoggingSettings {
            log_debug: true,
            log_queue: None,
        };
        let logger = build_logger(&logging, &queue);
        let telemetry = build_telemetry();

        let exporter_settings = ExporterSettings {
            batch_size: 10,
            full_batch_timeout_ms: 50,
            receive_timeout_ms: 10,
            soft_stop: false,
            endpoint: "http://127.0.0.1:4318/v1/logs".parse().expect("url"),
        };

        let exporter = build_exporter(&exporter_settings, queue, logger, telemetry)
            .expect("exporter should build");

        let ctx = RequestContext::new_request();
        ctx.cancel();
        tokio::time::timeout(Duration::from_millis(200), run_exporter_until_cancelled(&exporter, &ctx))
            .await
            .expect("exporter should terminate promptly when already cancelled");
    }
}

//! C7: the batching exporter state machine.
//!
//! Drains a queue, batches records by count or age, maps each batch into an
//! OTLP export request, and POSTs it. See `spec.md` §4.6 for the full state
//! machine this loop implements, including the soft-stop drain semantics.

use otlp_relay_domain::Record;
use otlp_relay_otlp::map_records;
use otlp_relay_ports::{ExportTransportPort, LoggerPort, QueuePort, TelemetryPort};
use otlp_relay_shared::{RequestContext, Result, Scope};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use url::Url;

/// Batching exporter configuration.
#[derive(Debug, Clone)]
pub struct BatchingExporterConfig {
    /// Flush once the open batch reaches this many records.
    pub batch_size: usize,
    /// Force-flush an open batch once it has been open this long.
    pub full_batch_timeout: Duration,
    /// Bound on a single blocking `receive`.
    pub receive_timeout: Duration,
    /// When true, the receive-timeout subscope is detached from the outer
    /// scope: outer cancellation cannot cut a blocking receive short, only
    /// the timeout can. See `spec.md` §9 "soft-stop semantics".
    pub soft_stop: bool,
    /// OTLP/HTTP collector endpoint this exporter POSTs batches to.
    pub endpoint: Url,
}

/// Pulls records from a [`QueuePort`], batches them, and exports them over
/// OTLP/HTTP via an [`ExportTransportPort`].
pub struct BatchingExporter {
    queue: Arc<dyn QueuePort>,
    transport: Arc<dyn ExportTransportPort>,
    logger: Arc<dyn LoggerPort>,
    telemetry: Arc<dyn TelemetryPort>,
    config: BatchingExporterConfig,
}

impl BatchingExporter {
    /// Build an exporter from its dependencies and configuration.
    #[must_use]
    pub const fn new(
        queue: Arc<dyn QueuePort>,
        transport: Arc<dyn ExportTransportPort>,
        logger: Arc<dyn LoggerPort>,
        telemetry: Arc<dyn TelemetryPort>,
        config: BatchingExporterConfig,
    ) -> Self {
        Self {
            queue,
            transport,
            logger,
            telemetry,
            config,
        }
    }

    /// Run the exporter loop until the outer scope's stop condition is met
    /// (see `spec.md` §4.6 step 5). Performs a final flush of any open
    /// batch before returning.
    pub async fn run(&self, ctx: &RequestContext) {
        let mut batch: Vec<Record> = Vec::new();
        let mut last_flush_at = Instant::now();

        loop {
            if batch.len() >= self.config.batch_size
                || last_flush_at.elapsed() > self.config.full_batch_timeout
            {
                self.flush(ctx, &mut batch).await;
                last_flush_at = Instant::now();
                continue;
            }

            let timeout_ctx = if self.config.soft_stop {
                RequestContext::with_scope(ctx.correlation_id().clone(), Scope::root())
            } else {
                ctx.child()
            };
            let timer_scope = timeout_ctx.scope();
            let receive_timeout = self.config.receive_timeout;
            let timer = tokio::spawn(async move {
                tokio::time::sleep(receive_timeout).await;
                timer_scope.cancel();
            });

            match self.queue.receive(&timeout_ctx).await {
                Ok(record) => {
                    batch.push(record);
                    timer.abort();
                },
                Err(error) if error.is_cancelled() => {
                    if ctx.is_cancelled() {
                        break;
                    }
                    // Receive-timeout fired without outer cancellation: just
                    // loop back and try again.
                },
                Err(error) => {
                    self.logger.warn(
                        "exporter.receive_failed",
                        &format!("queue receive failed: {error}"),
                        None,
                    );
                },
            }
        }

        if !batch.is_empty() {
            self.flush(ctx, &mut batch).await;
        }
    }

    /// Map, encode, and POST the current batch, then clear it regardless of
    /// outcome (`spec.md` §4.6 step 4: batches are never re-enqueued).
    async fn flush(&self, ctx: &RequestContext, batch: &mut Vec<Record>) {
        if batch.is_empty() {
            return;
        }

        let now_unix_nanos = now_unix_nanos();
        let request = map_records(batch, now_unix_nanos, self.logger.as_ref());
        batch.clear();

        let body = match serde_json::to_value(&request) {
            Ok(body) => body,
            Err(error) => {
                self.logger.error(
                    "exporter.flush.encode_failed",
                    &format!("failed to encode export request: {error}"),
                    None,
                );
                return;
            },
        };

        match self.transport.post_json(ctx, &self.config.endpoint, body).await {
            Err(error) => {
                self.logger.error(
                    "exporter.flush.transport_error",
                    &format!("export transport failed: {error}"),
                    None,
                );
                self.telemetry.increment_counter("exporter.flush.transport_error", 1, None);
            },
            Ok(response) if !(200..300).contains(&response.status) => {
                self.logger.error(
                    "exporter.flush.server_error",
                    &format!(
                        "export rejected with status {}: {:?}",
                        response.status, response.body
                    ),
                    None,
                );
                self.telemetry.increment_counter("exporter.flush.server_error", 1, None);
            },
            Ok(response) => {
                let partial_success = response
                    .body
                    .as_ref()
                    .and_then(|body| body.get("partialSuccess"))
                    .cloned();

                match partial_success {
                    Some(partial) => {
                        let rejected = partial
                            .get("rejectedLogRecords")
                            .and_then(serde_json::Value::as_i64)
                            .unwrap_or(0);
                        if rejected > 0 {
                            self.logger.error(
                                "exporter.flush.partial_success",
                                &format!(
                                    "export partially rejected: {}",
                                    partial
                                        .get("errorMessage")
                                        .and_then(serde_json::Value::as_str)
                                        .unwrap_or("no message")
                                ),
                                None,
                            );
                            self.telemetry
                                .increment_counter("exporter.flush.partial_success", 1, None);
                        } else {
                            self.logger.warn(
                                "exporter.flush.partial_warning",
                                &format!(
                                    "export server message: {}",
                                    partial
                                        .get("errorMessage")
                                        .and_then(serde_json::Value::as_str)
                                        .unwrap_or("no message")
                                ),
                                None,
                            );
                            self.telemetry
                                .increment_counter("exporter.flush.partial_warning", 1, None);
                        }
                    },
                    None => {
                        self.logger.debug("exporter.flush.success", "export succeeded", None);
                        self.telemetry.increment_counter("exporter.flush.success", 1, None);
                    },
                }
            },
        }
    }
}

fn now_unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| u64::try_from(duration.as_nanos()).ok())
        .unwrap_or_default()
}

//! Reqwest-based OTLP/HTTP export transport.

use otlp_relay_ports::{BoxFuture, ExportResponse, ExportTransportPort};
use otlp_relay_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::time::Duration;
use url::Url;

/// `ExportTransportPort` backed by a single shared `reqwest::Client`.
pub struct HttpExportTransport {
    client: reqwest::Client,
}

impl HttpExportTransport {
    /// Build a transport with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::export_transport_error(),
                    format!("failed to build export client: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;
        Ok(Self { client })
    }
}

impl ExportTransportPort for HttpExportTransport {
    fn post_json<'a>(
        &'a self,
        ctx: &'a RequestContext,
        endpoint: &'a Url,
        body: serde_json::Value,
    ) -> BoxFuture<'a, Result<ExportResponse>> {
        Box::pin(async move {
            ctx.ensure_not_cancelled("otlp_http.post_json")?;

            let response = tokio::select! {
                () = ctx.cancelled() => return Err(cancelled_error()),
                result = self.client.post(endpoint.clone()).json(&body).send() => {
                    result.map_err(|error| map_transport_error(&error))?
                }
            };

            let status = response.status().as_u16();
            let payload = tokio::select! {
                () = ctx.cancelled() => return Err(cancelled_error()),
                result = response.bytes() => result.map_err(|error| map_transport_error(&error))?,
            };

            let body = if payload.is_empty() {
                None
            } else {
                serde_json::from_slice(&payload).ok()
            };

            Ok(ExportResponse { status, body })
        })
    }
}

fn cancelled_error() -> ErrorEnvelope {
    ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", "otlp_http.post_json")
}

fn map_transport_error(error: &reqwest::Error) -> ErrorEnvelope {
    let class = if error.is_timeout() || error.is_connect() {
        ErrorClass::Retriable
    } else {
        ErrorClass::NonRetriable
    };
    ErrorEnvelope::unexpected(
        ErrorCode::export_transport_error(),
        format!("export request failed: {error}"),
        class,
    )
}

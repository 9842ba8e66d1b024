//! OTLP/HTTP export transport boundary contract.

use crate::BoxFuture;
use otlp_relay_shared::{RequestContext, Result};
use url::Url;

/// The caller-facing outcome of a single export POST, before the batching
/// exporter classifies it against the response body.
#[derive(Debug, Clone)]
pub struct ExportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw JSON response body, if the server returned one.
    pub body: Option<serde_json::Value>,
}

/// Boundary contract for posting an already-encoded OTLP export request.
pub trait ExportTransportPort: Send + Sync {
    /// POST the JSON-encoded request body to `endpoint`, honoring
    /// cancellation via `ctx`.
    fn post_json<'a>(
        &'a self,
        ctx: &'a RequestContext,
        endpoint: &'a Url,
        body: serde_json::Value,
    ) -> BoxFuture<'a, Result<ExportResponse>>;
}

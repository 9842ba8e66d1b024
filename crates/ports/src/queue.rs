//! Queue boundary contract.

use crate::BoxFuture;
use otlp_relay_domain::Record;
use otlp_relay_shared::{RequestContext, Result};

/// Boundary contract shared by the in-memory and durable queue adapters.
///
/// `send` never blocks: both adapters accept unboundedly (the in-memory
/// queue grows a `VecDeque`, the durable queue appends a row). `receive`
/// blocks until a record is available or the passed scope is cancelled, in
/// which case it returns `ErrorEnvelope::cancelled(..)` (checked with
/// `ErrorEnvelope::is_cancelled`).
pub trait QueuePort: Send + Sync {
    /// Enqueue a record.
    fn send<'a>(&'a self, record: Record) -> BoxFuture<'a, Result<()>>;

    /// Block until a record is available or the context is cancelled.
    fn receive<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<Record>>;
}

//! In-memory FIFO queue with cancellable blocking receive.

use otlp_relay_domain::Record;
use otlp_relay_ports::QueuePort;
use otlp_relay_shared::{ErrorEnvelope, RequestContext, Result};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;

struct State {
    buffer: VecDeque<Record>,
    waiters: VecDeque<oneshot::Sender<Record>>,
}

/// Unbounded, in-process FIFO queue. No persistence: records held here are
/// lost on process exit.
pub struct InMemoryQueue {
    state: Mutex<State>,
}

impl InMemoryQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                buffer: VecDeque::new(),
                waiters: VecDeque::new(),
            }),
        }
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl QueuePort for InMemoryQueue {
    fn send<'a>(
        &'a self,
        record: Record,
    ) -> otlp_relay_ports::BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let mut record = record;
            while let Some(waiter) = state.waiters.pop_front() {
                match waiter.send(record) {
                    Ok(()) => return Ok(()),
                    Err(returned) => record = returned,
                }
            }
            state.buffer.push_back(record);
            Ok(())
        })
    }

    fn receive<'a>(
        &'a self,
        ctx: &'a RequestContext,
    ) -> otlp_relay_ports::BoxFuture<'a, Result<Record>> {
        Box::pin(async move {
            ctx.ensure_not_cancelled("memory_queue.receive")?;

            let rx = {
                let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                if let Some(record) = state.buffer.pop_front() {
                    return Ok(record);
                }
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                rx
            };

            tokio::select! {
                () = ctx.cancelled() => Err(ErrorEnvelope::cancelled("operation cancelled")
                    .with_metadata("operation", "memory_queue.receive")),
                result = rx => result.map_err(|_| ErrorEnvelope::cancelled("operation cancelled")
                    .with_metadata("operation", "memory_queue.receive")),
            }
        })
    }
}

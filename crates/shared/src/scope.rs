//! Hierarchical cooperative cancellation.
//!
//! A `Scope` is a node in a tree. Cancelling a scope cancels it and every
//! live descendant; a scope created under an already-cancelled parent is
//! born cancelled. There is no way to un-cancel a scope.
//!
//! Notes:
//! - Cancellation is "best-effort": work that has not started is skipped;
//!   in-flight work may complete unless the task itself checks `done()`.
//! - Children are held by `Weak` reference so a dropped scope does not keep
//!   its parent's child list growing forever.

use crate::{ErrorCode, ErrorEnvelope, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::Notify;

/// A correlation identifier used for logging/telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Parse a correlation identifier from user input.
    ///
    /// The value is trimmed; empty values are rejected.
    pub fn parse(value: impl AsRef<str>) -> Result<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "correlationId must be non-empty",
            ));
        }
        Ok(Self(Arc::<str>::from(trimmed)))
    }

    /// Create a new request id, best-effort unique within this process.
    #[must_use]
    pub fn new_request_id() -> Self {
        next_scoped_id(&REQUEST_ID_COUNTER, "req_")
    }

    /// Borrow the identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_scoped_id(counter: &AtomicU64, prefix: &'static str) -> CorrelationId {
    let n = counter.fetch_add(1, Ordering::Relaxed);
    let id: Box<str> = format!("{prefix}{n}").into_boxed_str();
    CorrelationId(Arc::<str>::from(id))
}

struct ScopeInner {
    cancelled: AtomicBool,
    notify: Notify,
    children: Mutex<Vec<Weak<ScopeInner>>>,
}

/// A node in the cancellation tree.
///
/// Cloning a `Scope` clones a handle to the same node; use [`Scope::child`]
/// to create a genuinely new descendant.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Scope")
            .field("cancelled", &self.done())
            .finish()
    }
}

impl Scope {
    /// Create a new root scope, not cancelled.
    #[must_use]
    pub fn root() -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Create a child scope.
    ///
    /// If this scope is already cancelled, the child is born cancelled:
    /// the cancelled-check and the registration happen under the same lock
    /// so a concurrent `cancel()` cannot race a child into existing
    /// uncancelled after its parent has already cancelled.
    #[must_use]
    pub fn child(&self) -> Self {
        let mut children = self
            .inner
            .children
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let child = Arc::new(ScopeInner {
            cancelled: AtomicBool::new(self.inner.cancelled.load(Ordering::SeqCst)),
            notify: Notify::new(),
            children: Mutex::new(Vec::new()),
        });

        children.push(Arc::downgrade(&child));
        Self { inner: child }
    }

    /// Cancel this scope and every live descendant. Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.notify.notify_waiters();

        let children = std::mem::take(
            &mut *self
                .inner
                .children
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        );
        for weak_child in children {
            if let Some(child) = weak_child.upgrade() {
                Self { inner: child }.cancel();
            }
        }
    }

    /// Non-blocking check: has this scope been cancelled?
    #[must_use]
    pub fn done(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until this scope is cancelled.
    pub async fn cancelled(&self) {
        if self.done() {
            return;
        }
        loop {
            let notified = self.inner.notify.notified();
            if self.done() {
                return;
            }
            notified.await;
            if self.done() {
                return;
            }
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

/// Request-scoped context: a cancellation [`Scope`] paired with a
/// correlation id for logging.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: CorrelationId,
    scope: Scope,
}

impl RequestContext {
    /// Create a new request context with a fresh root scope.
    #[must_use]
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            scope: Scope::root(),
        }
    }

    /// Convenience constructor: create a context with an auto-generated `req_*` id.
    #[must_use]
    pub fn new_request() -> Self {
        Self::new(CorrelationId::new_request_id())
    }

    /// Create a context that shares the given scope (e.g. a child scope of
    /// an existing request).
    #[must_use]
    pub const fn with_scope(correlation_id: CorrelationId, scope: Scope) -> Self {
        Self {
            correlation_id,
            scope,
        }
    }

    /// Derive a child context: same correlation id, a child scope.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            scope: self.scope.child(),
        }
    }

    /// Return the correlation id.
    #[must_use]
    pub const fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Return a clone of the scope.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope.clone()
    }

    /// Returns true if the request was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.scope.done()
    }

    /// Cancel this request's scope (and all its children).
    pub fn cancel(&self) {
        self.scope.cancel();
    }

    /// Await cancellation.
    pub async fn cancelled(&self) {
        self.scope.cancelled().await;
    }

    /// Return a cancellation error when cancelled, including operation metadata.
    pub fn ensure_not_cancelled(&self, operation: &'static str) -> Result<()> {
        if self.is_cancelled() {
            return Err(ErrorEnvelope::cancelled("operation cancelled")
                .with_metadata("operation", operation));
        }
        Ok(())
    }
}

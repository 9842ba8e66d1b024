//! URL classification boundary contract.
//!
//! The dispatch endpoint described alongside the producer (see the
//! top-level design notes) routes an inbound URL to a target record shape
//! via heuristics that live entirely outside this workspace. This trait is
//! the seam the producer's `dispatch` use case calls through, so the real
//! classifier and a test double can be swapped without touching the
//! producer.

use crate::BoxFuture;
use otlp_relay_shared::{RequestContext, Result};

/// The classifier's verdict for a given URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlClass {
    /// The URL matched a known shape and should be recorded as such.
    Matched {
        /// Stable label for the matched shape, used as a record attribute.
        label: String,
    },
    /// The URL matched nothing; the caller should treat this as a
    /// client-error-shaped failure.
    Unmatched,
}

/// Boundary contract for URL classification.
pub trait UrlClassifierPort: Send + Sync {
    /// Classify a URL.
    fn classify<'a>(&'a self, ctx: &'a RequestContext, url: &'a str)
    -> BoxFuture<'a, Result<UrlClass>>;
}

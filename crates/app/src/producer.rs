//! C8: producer-side enqueue retry and URL dispatch.

use otlp_relay_domain::Record;
use otlp_relay_ports::{LoggerPort, QueuePort, UrlClass, UrlClassifierPort};
use otlp_relay_shared::retry::{RetryPolicy, retry_async_with_observer};
use otlp_relay_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};

const ENQUEUE_MAX_ATTEMPTS: u32 = 5;
const ENQUEUE_RETRY_DELAY_MS: u64 = 500;

/// Enqueue a record, retrying up to 5 times with a fixed 500ms delay between
/// attempts. On exhaustion, returns a terminal failure wrapping the queue's
/// last error as its cause.
pub async fn enqueue_with_retry(
    ctx: &RequestContext,
    queue: &dyn QueuePort,
    record: Record,
    logger: &dyn LoggerPort,
) -> Result<()> {
    let policy = RetryPolicy::fixed(ENQUEUE_RETRY_DELAY_MS, ENQUEUE_MAX_ATTEMPTS);

    retry_async_with_observer(
        ctx,
        policy,
        "producer.enqueue",
        &mut || {
            let record = record.clone();
            async move { queue.send(record).await }
        },
        |attempt, error| {
            logger.warn(
                "producer.enqueue_retry",
                &format!("queue send failed on attempt {attempt}: {error}"),
                None,
            );
        },
    )
    .await
    .map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::queue_unavailable(),
            "queue send exhausted all retry attempts",
            ErrorClass::NonRetriable,
        )
        .with_cause(error)
    })
}

/// The outcome of a successful dispatch: the URL and the classification
/// label the record was tagged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The classified URL.
    pub url: String,
    /// The classifier's label for the matched shape.
    pub content_type: String,
}

/// Dependencies `dispatch` needs, grouped so callers don't have to thread
/// four separate parameters through every call site.
pub struct DispatchDeps<'a> {
    /// Queue the record is enqueued onto.
    pub queue: &'a dyn QueuePort,
    /// Classifier that routes the URL to a record shape.
    pub classifier: &'a dyn UrlClassifierPort,
    /// Logger used to report retry attempts.
    pub logger: &'a dyn LoggerPort,
}

/// Classify a URL, build a record from the result, and enqueue it with
/// retry. An unmatched URL is a client-error-shaped failure (`spec.md`
/// §6.3); retry exhaustion is a server-error-shaped failure.
pub async fn dispatch(
    ctx: &RequestContext,
    deps: DispatchDeps<'_>,
    url: &str,
) -> Result<DispatchOutcome> {
    let content_type = match deps.classifier.classify(ctx, url).await? {
        UrlClass::Matched { label } => label,
        UrlClass::Unmatched => {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("url did not match a known shape: {url}"),
            ));
        },
    };

    let mut record = Record::new();
    record.insert("message", "dispatch");
    record.insert("url", url);
    record.insert("contentType", content_type.clone());

    enqueue_with_retry(ctx, deps.queue, record, deps.logger).await?;

    Ok(DispatchOutcome {
        url: url.to_owned(),
        content_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use otlp_relay_adapters::log_sink::StderrLogSink;
    use otlp_relay_adapters::logger::JsonLogger;
    use otlp_relay_adapters::queue::InMemoryQueue;
    use otlp_relay_ports::BoxFuture;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyQueue {
        failures_remaining: AtomicU32,
        inner: InMemoryQueue,
    }

    impl FlakyQueue {
        fn new(failures: u32) -> Self {
            Self {
                failures_remaining: AtomicU32::new(failures),
                inner: InMemoryQueue::new(),
            }
        }
    }

    impl QueuePort for FlakyQueue {
        fn send<'a>(&'a self, record: Record) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                if self.failures_remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    if n > 0 { Some(n - 1) } else { None }
                }).is_ok() {
                    return Err(ErrorEnvelope::unexpected(
                        ErrorCode::queue_unavailable(),
                        "simulated failure",
                        ErrorClass::Retriable,
                    ));
                }
                self.inner.send(record).await
            })
        }

        fn receive<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<Record>> {
            self.inner.receive(ctx)
        }
    }

    struct StaticClassifier(UrlClass);

    impl UrlClassifierPort for StaticClassifier {
        fn classify<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _url: &'a str,
        ) -> BoxFuture<'a, Result<UrlClass>> {
            let verdict = self.0.clone();
            Box::pin(async move { Ok(verdict) })
        }
    }

    fn logger() -> JsonLogger {
        JsonLogger::new(Arc::new(StderrLogSink))
    }

    #[tokio::test]
    async fn enqueue_succeeds_after_transient_failures() {
        let queue = FlakyQueue::new(2);
        let ctx = RequestContext::new_request();
        let logger = logger();

        let mut record = Record::new();
        record.insert("message", "hi");

        enqueue_with_retry(&ctx, &queue, record, &logger)
            .await
            .expect("should succeed within the retry budget");
    }

    #[tokio::test]
    async fn enqueue_exhausts_retries_and_wraps_the_cause() {
        let queue = FlakyQueue::new(10);
        let ctx = RequestContext::new_request();
        let logger = logger();

        let mut record = Record::new();
        record.insert("message", "hi");

        let error = enqueue_with_retry(&ctx, &queue, record, &logger)
            .await
            .expect_err("should exhaust all attempts");

        assert_eq!(error.code, ErrorCode::queue_unavailable());
        assert!(error.cause.is_some());
    }

    #[tokio::test]
    async fn dispatch_rejects_unmatched_urls() {
        let queue = InMemoryQueue::new();
        let classifier = StaticClassifier(UrlClass::Unmatched);
        let logger = logger();
        let ctx = RequestContext::new_request();

        let error = dispatch(
            &ctx,
            DispatchDeps {
                queue: &queue,
                classifier: &classifier,
                logger: &logger,
            },
            "https://example.invalid/nope",
        )
        .await
        .expect_err("unmatched url should fail");

        assert_eq!(error.code, ErrorCode::invalid_input());
    }

    #[tokio::test]
    async fn dispatch_enqueues_matched_urls() {
        let queue = InMemoryQueue::new();
        let classifier = StaticClassifier(UrlClass::Matched {
            label: "feed".to_owned(),
        });
        let logger = logger();
        let ctx = RequestContext::new_request();

        let outcome = dispatch(
            &ctx,
            DispatchDeps {
                queue: &queue,
                classifier: &classifier,
                logger: &logger,
            },
            "https://example.com/feed.xml",
        )
        .await
        .expect("dispatch should succeed");

        assert_eq!(outcome.content_type, "feed");
        let record = queue.receive(&ctx).await.expect("record should be queued");
        assert_eq!(record.get_str("url"), Some("https://example.com/feed.xml"));
    }
}

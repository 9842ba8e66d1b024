//! SQLite-backed durable queue: single file, at-least-once across restarts.

use otlp_relay_domain::Record;
use otlp_relay_ports::{BoxFuture, QueuePort};
use otlp_relay_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::spawn_blocking;

/// How often `receive` falls back to polling the table when the in-process
/// notify has not fired. Guards against a record left by a crashed process.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn queue_error(message: impl Into<String>) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::queue_unavailable(), message, ErrorClass::Retriable)
}

/// A single-file SQLite-backed FIFO queue.
///
/// `send` and `receive` run on `spawn_blocking`: `rusqlite::Connection` is
/// not `Send` across `.await` points, and SQLite access is blocking I/O
/// regardless.
pub struct SqliteQueue {
    path: PathBuf,
    notify: Arc<Notify>,
}

impl SqliteQueue {
    /// Open (creating if absent) a durable queue backed by `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let conn = open_connection(&path)?;
        drop(conn);
        Ok(Self {
            path,
            notify: Arc::new(Notify::new()),
        })
    }

}

fn dequeue_once(path: &Path) -> Result<Option<Record>> {
    let mut conn = open_connection(path)?;
    let tx = conn
        .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
        .map_err(|error| queue_error(format!("durable queue transaction failed: {error}")))?;

    let row: Option<(i64, String)> = tx
        .query_row(
            "SELECT id, payload FROM messages ORDER BY id ASC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(|error| queue_error(format!("durable queue query failed: {error}")))?;

    let Some((id, payload)) = row else {
        return Ok(None);
    };

    tx.execute("DELETE FROM messages WHERE id = ?1", [id])
        .map_err(|error| queue_error(format!("durable queue delete failed: {error}")))?;

    tx.commit()
        .map_err(|error| queue_error(format!("durable queue commit failed: {error}")))?;

    let record: Record = serde_json::from_str(&payload)
        .map_err(|error| queue_error(format!("durable queue decode failed: {error}")))?;
    Ok(Some(record))
}

impl QueuePort for SqliteQueue {
    fn send<'a>(&'a self, record: Record) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let path = self.path.clone();
            let payload = serde_json::to_string(&record)
                .map_err(|error| queue_error(format!("durable queue encode failed: {error}")))?;

            spawn_blocking(move || {
                let conn = open_connection(&path)?;
                let now = now_epoch_ms()?;
                conn.execute(
                    "INSERT INTO messages (payload, enqueued_at) VALUES (?1, ?2)",
                    (&payload, now),
                )
                .map_err(|error| queue_error(format!("durable queue insert failed: {error}")))?;
                Ok::<(), ErrorEnvelope>(())
            })
            .await
            .map_err(|error| queue_error(format!("durable queue task failed: {error}")))??;

            self.notify.notify_one();
            Ok(())
        })
    }

    fn receive<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<Record>> {
        Box::pin(async move {
            loop {
                ctx.ensure_not_cancelled("durable_queue.receive")?;

                let path = self.path.clone();
                let record = spawn_blocking(move || dequeue_once(&path))
                    .await
                    .map_err(|error| queue_error(format!("durable queue task failed: {error}")))??;

                if let Some(record) = record {
                    return Ok(record);
                }

                tokio::select! {
                    () = ctx.cancelled() => {
                        return Err(ErrorEnvelope::cancelled("operation cancelled")
                            .with_metadata("operation", "durable_queue.receive"));
                    }
                    () = self.notify.notified() => {}
                    () = tokio::time::sleep(POLL_INTERVAL) => {}
                }
            }
        })
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|error| queue_error(format!("durable queue mkdir failed: {error}")))?;
        }
    }

    let conn = Connection::open(path)
        .map_err(|error| queue_error(format!("durable queue open failed: {error}")))?;

    conn.execute_batch("PRAGMA journal_mode = WAL;")
        .map_err(|error| queue_error(format!("durable queue pragma failed: {error}")))?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            payload TEXT NOT NULL,
            enqueued_at INTEGER NOT NULL
         );",
    )
    .map_err(|error| queue_error(format!("durable queue schema failed: {error}")))?;

    Ok(conn)
}

fn now_epoch_ms() -> Result<i64> {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|error| queue_error(format!("system clock error: {error}")))?;
    i64::try_from(duration.as_millis())
        .map_err(|error| queue_error(format!("clock overflow: {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use otlp_relay_shared::CorrelationId;
    use serde_json::json;
    use tempfile::tempdir;

    fn ctx() -> RequestContext {
        RequestContext::new(CorrelationId::parse("test").expect("correlation id"))
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let dir = tempdir().expect("tempdir");
        let queue = SqliteQueue::open(dir.path().join("queue.db")).expect("open");

        for i in 1..=3 {
            let mut record = Record::new();
            record.insert("i", json!(i));
            queue.send(record).await.expect("send");
        }

        let ctx = ctx();
        for i in 1..=3 {
            let record = queue.receive(&ctx).await.expect("receive");
            assert_eq!(record.get("i"), Some(&json!(i)));
        }
    }

    #[tokio::test]
    async fn survives_reopen_across_process_restart() {
        let dir = tempdir().expect("tempdir");
        let db_path = dir.path().join("queue.db");

        {
            let queue = SqliteQueue::open(&db_path).expect("open");
            let mut record = Record::new();
            record.insert("i", json!(1));
            queue.send(record).await.expect("send");
        }

        let queue = SqliteQueue::open(&db_path).expect("reopen");
        let ctx = ctx();
        let record = queue.receive(&ctx).await.expect("receive");
        assert_eq!(record.get("i"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn cancelled_scope_unblocks_receive_on_empty_queue() {
        let dir = tempdir().expect("tempdir");
        let queue = Arc::new(SqliteQueue::open(dir.path().join("queue.db")).expect("open"));
        let ctx = ctx();
        let scope = ctx.scope();

        let receive = tokio::spawn({
            let queue = Arc::clone(&queue);
            let ctx = ctx.clone();
            async move { queue.receive(&ctx).await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        scope.cancel();

        let result = tokio::time::timeout(Duration::from_millis(500), receive)
            .await
            .expect("receive should resolve promptly")
            .expect("receive task should not panic");
        assert!(result.is_err_and(|error| error.is_cancelled()));
    }

    #[tokio::test]
    async fn concurrent_receivers_never_get_the_same_record() {
        let dir = tempdir().expect("tempdir");
        let queue = Arc::new(SqliteQueue::open(dir.path().join("queue.db")).expect("open"));

        for i in 1..=20 {
            let mut record = Record::new();
            record.insert("i", json!(i));
            queue.send(record).await.expect("send");
        }

        let mut receivers = Vec::new();
        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            let ctx = ctx();
            receivers.push(tokio::spawn(async move {
                let mut received = Vec::new();
                for _ in 0..5 {
                    let record = tokio::time::timeout(
                        Duration::from_millis(500),
                        queue.receive(&ctx),
                    )
                    .await
                    .expect("receive should resolve promptly")
                    .expect("receive should not error");
                    received.push(record.get("i").and_then(serde_json::Value::as_i64).unwrap());
                }
                received
            }));
        }

        let mut all_received = Vec::new();
        for receiver in receivers {
            all_received.extend(receiver.await.expect("receiver task should not panic"));
        }

        all_received.sort_unstable();
        assert_eq!(all_received, (1..=20).collect::<Vec<_>>());
    }
}

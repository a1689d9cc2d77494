//! Polling workers and the stale-claim sweeper.
//!
//! Workers are independent pollers sharing nothing but the store: each one
//! claims on a fixed interval, runs the publisher, and reports the outcome
//! back. The store decides requeue vs. terminal; the loop only reports.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::PlatformResult;
use crate::queue::{PublishQueue, QueueItemRecord, RetryDisposition};

/// Publishes one claimed item to the external platform.
///
/// The error is a plain description; it lands in the row's `error_message`
/// via `mark_failed`. Actual HTTP/auth plumbing lives behind this seam.
#[async_trait]
pub trait Publisher<R: PlatformResult>: Send + Sync {
    async fn publish(&self, item: &QueueItemRecord<R>) -> Result<R, String>;
}

/// Worker group handle.
/// - `request_shutdown` stops taking new claims; in-flight publishes finish.
/// - `shutdown_and_join` waits for all workers to exit.
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` polling workers named `{key_prefix}-{i}`.
    pub fn spawn<R: PlatformResult>(
        n: usize,
        queue: Arc<dyn PublishQueue<R>>,
        publisher: Arc<dyn Publisher<R>>,
        poll_interval: Duration,
        key_prefix: &str,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for i in 0..n {
            let worker_key = format!("{key_prefix}-{i}");
            let q = Arc::clone(&queue);
            let p = Arc::clone(&publisher);
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_key, q, p, poll_interval, &mut rx).await;
            });
            joins.push(join);
        }

        Self { shutdown_tx, joins }
    }

    /// Request shutdown for all workers.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
    }
}

async fn worker_loop<R: PlatformResult>(
    worker_key: String,
    queue: Arc<dyn PublishQueue<R>>,
    publisher: Arc<dyn Publisher<R>>,
    poll_interval: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let claimed = match queue.claim_next(&worker_key).await {
            Ok(claimed) => claimed,
            Err(e) => {
                warn!(worker = %worker_key, error = %e, "claim failed");
                None
            }
        };

        let Some(item) = claimed else {
            // Nothing claimable right now; poll again after the interval.
            tokio::select! {
                _ = shutdown_rx.changed() => {}
                _ = tokio::time::sleep(poll_interval) => {}
            }
            continue;
        };

        let id = item.id;
        match publisher.publish(&item).await {
            Ok(result) => {
                if let Err(e) = queue.mark_published(id, result).await {
                    warn!(worker = %worker_key, item = %id, error = %e, "publish report failed");
                }
            }
            Err(error) => match queue.mark_failed(id, &error).await {
                Ok(RetryDisposition::Requeued(record)) => {
                    info!(
                        worker = %worker_key,
                        item = %id,
                        retry = record.retry_count,
                        "publish failed, item requeued"
                    );
                }
                Ok(RetryDisposition::Exhausted(record)) => {
                    warn!(
                        worker = %worker_key,
                        item = %id,
                        attempts = record.retry_count,
                        "retries exhausted, item failed"
                    );
                }
                Err(e) => {
                    warn!(worker = %worker_key, item = %id, error = %e, "failure report failed");
                }
            },
        }
    }
}

/// Returns orphaned `Processing` rows (claim-then-crash) to `Pending` on an
/// interval. Remediation is deliberately explicit: `claim_next` never
/// resurrects rows on its own.
pub struct StaleSweeper {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl StaleSweeper {
    pub fn spawn<R: PlatformResult>(
        queue: Arc<dyn PublishQueue<R>>,
        sweep_interval: Duration,
        older_than: chrono::Duration,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {}
                    _ = tokio::time::sleep(sweep_interval) => {}
                }
                if *shutdown_rx.borrow() {
                    break;
                }

                match queue.release_stale(older_than).await {
                    Ok(0) => {}
                    Ok(released) => {
                        warn!(released, "returned stale processing items to pending");
                    }
                    Err(e) => warn!(error = %e, "stale sweep failed"),
                }
            }
        });

        Self { shutdown_tx, join }
    }

    pub async fn shutdown_and_join(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
    }
}

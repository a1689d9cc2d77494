//! Publish queue: state machine, records, in-memory store, pagination.

mod memory;
mod record;
mod scan;
mod state;

pub use memory::InMemoryPublishQueue;
pub use record::QueueItemRecord;
pub use scan::{Page, PageToken, StatusScan};
pub use state::ItemState;

use async_trait::async_trait;

use crate::domain::{ItemId, PlatformResult, PostPayload, RestaurantContext};
use crate::error::QueueError;
use crate::observability::QueueCounts;

/// Queue configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Failure budget applied to every enqueued item.
    pub default_max_retries: u32,

    /// When set, a post may occupy at most one row in this queue and a
    /// duplicate enqueue fails with `Conflict`. Off by default: repeated
    /// enqueuing for the same post creates independent rows.
    pub unique_post_id: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_max_retries: 3,
            unique_post_id: false,
        }
    }
}

/// Where an item landed after a failure report.
#[derive(Debug, Clone)]
pub enum RetryDisposition<R: PlatformResult> {
    /// Budget remains; the item is claimable again.
    Requeued(QueueItemRecord<R>),

    /// Retries exhausted; the item is terminally failed.
    Exhausted(QueueItemRecord<R>),
}

impl<R: PlatformResult> RetryDisposition<R> {
    pub fn record(&self) -> &QueueItemRecord<R> {
        match self {
            RetryDisposition::Requeued(r) | RetryDisposition::Exhausted(r) => r,
        }
    }
}

/// Store port polled by workers.
///
/// The in-memory implementation is the v1 store; this trait is the seam for
/// swapping in a durable one without touching the worker loops.
#[async_trait]
pub trait PublishQueue<R: PlatformResult>: Send + Sync {
    /// Create a row in `Pending` with a fresh id and `retry_count = 0`.
    async fn enqueue(
        &self,
        payload: PostPayload,
        restaurant: RestaurantContext,
    ) -> Result<QueueItemRecord<R>, QueueError>;

    /// Atomically claim the oldest `Pending` row for `worker_key`.
    ///
    /// `Ok(None)` when nothing is claimable. Concurrent callers never
    /// receive the same row.
    async fn claim_next(&self, worker_key: &str)
    -> Result<Option<QueueItemRecord<R>>, QueueError>;

    /// Processing -> Published, storing the platform result.
    async fn mark_published(&self, id: ItemId, result: R)
    -> Result<QueueItemRecord<R>, QueueError>;

    /// Report a failed attempt; the store decides requeue vs. terminal.
    async fn mark_failed(&self, id: ItemId, error: &str)
    -> Result<RetryDisposition<R>, QueueError>;

    /// Snapshot of a single row.
    async fn get(&self, id: ItemId) -> Result<Option<QueueItemRecord<R>>, QueueError>;

    /// One keyset page of rows in `status`, `created_at` descending.
    /// `StatusScan` wraps this into a restartable sequence.
    async fn by_status_page(
        &self,
        status: ItemState,
        cursor: Option<PageToken>,
        limit: usize,
    ) -> Result<Page<R>, QueueError>;

    /// Observability tallies.
    async fn counts_by_state(&self) -> Result<QueueCounts, QueueError>;

    /// Return `Processing` rows untouched for longer than `older_than` to
    /// `Pending`, clearing their claim. Returns how many were released.
    async fn release_stale(&self, older_than: chrono::Duration) -> Result<usize, QueueError>;
}

//! In-memory publish queue implementation.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{ItemState, Page, PageToken, PublishQueue, QueueConfig, QueueItemRecord,
            RetryDisposition};
use crate::clock::{Clock, SystemClock};
use crate::domain::{IdGenerator, ItemId, PlatformResult, PostId, PostPayload, RestaurantContext,
                    UlidIdGenerator};
use crate::error::QueueError;
use crate::observability::QueueCounts;

/// In-memory queue state.
struct QueueState<R: PlatformResult> {
    /// All item records (single source of truth).
    records: HashMap<ItemId, QueueItemRecord<R>>,

    /// Claim-order index: oldest `created_at` first, id breaks ties.
    /// Re-queued items keep their original position because the key is the
    /// immutable `created_at`.
    pending: BTreeSet<(DateTime<Utc>, ItemId)>,

    /// Posts that have ever occupied a row; maintained only when
    /// `unique_post_id` is on.
    post_ids: HashSet<PostId>,
}

impl<R: PlatformResult> QueueState<R> {
    fn new() -> Self {
        Self {
            records: HashMap::new(),
            pending: BTreeSet::new(),
            post_ids: HashSet::new(),
        }
    }

    fn counts_by_state(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for record in self.records.values() {
            match record.state {
                ItemState::Pending => counts.pending += 1,
                ItemState::Processing => counts.processing += 1,
                ItemState::Published => counts.published += 1,
                ItemState::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

/// Mutex-guarded in-memory store.
///
/// Every operation is one critical section, so each state transition is
/// all-or-nothing and `claim_next` is a single conditional update: check
/// `Pending`, flip to `Processing`, stamp the claimant, all under the lock.
pub struct InMemoryPublishQueue<R: PlatformResult> {
    state: Mutex<QueueState<R>>,
    config: QueueConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<R: PlatformResult> InMemoryPublishQueue<R> {
    pub fn new(config: QueueConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(SystemClock),
            Arc::new(UlidIdGenerator::new(SystemClock)),
        )
    }

    /// Injectable clock and id source, for tests.
    pub fn with_parts(
        config: QueueConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            state: Mutex::new(QueueState::new()),
            config,
            clock,
            ids,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }
}

#[async_trait]
impl<R: PlatformResult> PublishQueue<R> for InMemoryPublishQueue<R> {
    async fn enqueue(
        &self,
        payload: PostPayload,
        restaurant: RestaurantContext,
    ) -> Result<QueueItemRecord<R>, QueueError> {
        payload.validate()?;

        let mut state = self.state.lock().await;
        if self.config.unique_post_id && state.post_ids.contains(&payload.post_id) {
            return Err(QueueError::conflict(format!(
                "post {} already occupies a queue row",
                payload.post_id
            )));
        }

        let now = self.clock.now();
        let id = self.ids.generate_item_id();
        let record = QueueItemRecord::new(
            id,
            payload,
            restaurant,
            self.config.default_max_retries,
            now,
        );

        if self.config.unique_post_id {
            state.post_ids.insert(record.payload.post_id.clone());
        }
        state.pending.insert((record.created_at, id));
        state.records.insert(id, record.clone());

        Ok(record)
    }

    async fn claim_next(
        &self,
        worker_key: &str,
    ) -> Result<Option<QueueItemRecord<R>>, QueueError> {
        let mut state = self.state.lock().await;

        let Some(key) = state.pending.iter().next().copied() else {
            return Ok(None);
        };
        state.pending.remove(&key);

        let (_, id) = key;
        let now = self.clock.now();
        let record = state
            .records
            .get_mut(&id)
            .ok_or_else(|| QueueError::not_found("queue item", id))?;
        record.begin_processing(worker_key, now);

        Ok(Some(record.clone()))
    }

    async fn mark_published(
        &self,
        id: ItemId,
        result: R,
    ) -> Result<QueueItemRecord<R>, QueueError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let record = state
            .records
            .get_mut(&id)
            .ok_or_else(|| QueueError::not_found("queue item", id))?;
        if record.state != ItemState::Processing {
            return Err(QueueError::conflict(format!(
                "item {id} is {}, expected processing",
                record.state
            )));
        }

        record.complete(result, now);
        Ok(record.clone())
    }

    async fn mark_failed(
        &self,
        id: ItemId,
        error: &str,
    ) -> Result<RetryDisposition<R>, QueueError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let record = state
            .records
            .get_mut(&id)
            .ok_or_else(|| QueueError::not_found("queue item", id))?;
        match record.state {
            ItemState::Processing => {}
            ItemState::Failed => {
                return Err(QueueError::ExhaustedRetries {
                    id,
                    attempts: record.retry_count,
                });
            }
            other => {
                return Err(QueueError::conflict(format!(
                    "item {id} is {other}, expected processing"
                )));
            }
        }

        let exhausted = record.record_failure(error, now);
        let snapshot = record.clone();
        if exhausted {
            Ok(RetryDisposition::Exhausted(snapshot))
        } else {
            state.pending.insert((snapshot.created_at, id));
            Ok(RetryDisposition::Requeued(snapshot))
        }
    }

    async fn get(&self, id: ItemId) -> Result<Option<QueueItemRecord<R>>, QueueError> {
        let state = self.state.lock().await;
        Ok(state.records.get(&id).cloned())
    }

    async fn by_status_page(
        &self,
        status: ItemState,
        cursor: Option<PageToken>,
        limit: usize,
    ) -> Result<Page<R>, QueueError> {
        // A zero limit would never make progress.
        let limit = limit.max(1);

        let state = self.state.lock().await;
        let mut matching: Vec<&QueueItemRecord<R>> = state
            .records
            .values()
            .filter(|r| r.state == status)
            .collect();
        // Newest first; ULID ids break created_at ties deterministically.
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let items: Vec<QueueItemRecord<R>> = matching
            .into_iter()
            .filter(|r| match cursor {
                Some(token) => (r.created_at, r.id) < (token.created_at, token.id),
                None => true,
            })
            .take(limit)
            .cloned()
            .collect();

        let next = if items.len() == limit {
            items.last().map(PageToken::of)
        } else {
            None
        };

        Ok(Page { items, next })
    }

    async fn counts_by_state(&self) -> Result<QueueCounts, QueueError> {
        let state = self.state.lock().await;
        Ok(state.counts_by_state())
    }

    async fn release_stale(&self, older_than: chrono::Duration) -> Result<usize, QueueError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        let cutoff = now - older_than;

        let stale: Vec<(DateTime<Utc>, ItemId)> = state
            .records
            .values()
            .filter(|r| r.state == ItemState::Processing && r.updated_at <= cutoff)
            .map(|r| (r.created_at, r.id))
            .collect();

        for &(created_at, id) in &stale {
            if let Some(record) = state.records.get_mut(&id) {
                record.release(now);
            }
            state.pending.insert((created_at, id));
        }

        Ok(stale.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::NaverResult;
    use crate::queue::StatusScan;
    use chrono::TimeZone;
    use rstest::rstest;

    fn test_queue(config: QueueConfig) -> (InMemoryPublishQueue<NaverResult>, FixedClock) {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let queue = InMemoryPublishQueue::with_parts(
            config,
            Arc::new(clock.clone()),
            Arc::new(UlidIdGenerator::new(SystemClock)),
        );
        (queue, clock)
    }

    fn payload(post: &str) -> PostPayload {
        PostPayload::new(post, "title", "content")
    }

    fn naver_url(post: &str) -> NaverResult {
        NaverResult {
            naver_url: format!("https://blog.naver.example/{post}"),
        }
    }

    #[tokio::test]
    async fn enqueue_creates_pending_row_with_fresh_id() {
        let (queue, _clock) = test_queue(QueueConfig::default());

        let a = queue
            .enqueue(payload("p1"), RestaurantContext::default())
            .await
            .unwrap();
        let b = queue
            .enqueue(payload("p2"), RestaurantContext::default())
            .await
            .unwrap();

        assert_eq!(a.state, ItemState::Pending);
        assert_eq!(a.retry_count, 0);
        assert_ne!(a.id, b.id);

        let counts = queue.counts_by_state().await.unwrap();
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.total(), 2);
    }

    #[rstest]
    #[case::empty_post_id("")]
    #[case::whitespace_post_id("   ")]
    #[tokio::test]
    async fn enqueue_rejects_invalid_payload(#[case] post_id: &str) {
        let (queue, _clock) = test_queue(QueueConfig::default());

        let err = queue
            .enqueue(payload(post_id), RestaurantContext::default())
            .await
            .unwrap_err();

        assert!(matches!(err, QueueError::Validation(_)));
        assert_eq!(queue.counts_by_state().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn unique_post_id_rejects_second_row() {
        let (queue, _clock) = test_queue(QueueConfig {
            unique_post_id: true,
            ..QueueConfig::default()
        });

        queue
            .enqueue(payload("p1"), RestaurantContext::default())
            .await
            .unwrap();
        let err = queue
            .enqueue(payload("p1"), RestaurantContext::default())
            .await
            .unwrap_err();

        assert!(matches!(err, QueueError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_posts_allowed_by_default() {
        let (queue, _clock) = test_queue(QueueConfig::default());

        queue
            .enqueue(payload("p1"), RestaurantContext::default())
            .await
            .unwrap();
        queue
            .enqueue(payload("p1"), RestaurantContext::default())
            .await
            .unwrap();

        assert_eq!(queue.counts_by_state().await.unwrap().pending, 2);
    }

    #[tokio::test]
    async fn claim_takes_oldest_first() {
        let (queue, clock) = test_queue(QueueConfig::default());

        let first = queue
            .enqueue(payload("p1"), RestaurantContext::default())
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(1));
        queue
            .enqueue(payload("p2"), RestaurantContext::default())
            .await
            .unwrap();

        let claimed = queue.claim_next("w1").await.unwrap().unwrap();
        assert_eq!(claimed.id, first.id);
        assert_eq!(claimed.state, ItemState::Processing);
        assert_eq!(claimed.worker_key.as_deref(), Some("w1"));
    }

    #[tokio::test]
    async fn claim_on_empty_queue_returns_none() {
        let (queue, _clock) = test_queue(QueueConfig::default());
        assert!(queue.claim_next("w1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn one_pending_item_goes_to_exactly_one_claimant() {
        let queue: Arc<InMemoryPublishQueue<NaverResult>> =
            Arc::new(InMemoryPublishQueue::new(QueueConfig::default()));
        queue
            .enqueue(payload("p1"), RestaurantContext::default())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let q = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                q.claim_next(&format!("w{i}")).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn requeued_item_keeps_its_claim_position() {
        let (queue, clock) = test_queue(QueueConfig::default());

        let old = queue
            .enqueue(payload("old"), RestaurantContext::default())
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(1));
        queue
            .enqueue(payload("new"), RestaurantContext::default())
            .await
            .unwrap();

        let claimed = queue.claim_next("w1").await.unwrap().unwrap();
        assert_eq!(claimed.id, old.id);
        queue.mark_failed(old.id, "net error").await.unwrap();

        // The re-queued row still sorts before the younger one.
        let reclaimed = queue.claim_next("w2").await.unwrap().unwrap();
        assert_eq!(reclaimed.id, old.id);
        assert_eq!(reclaimed.retry_count, 1);
    }

    #[tokio::test]
    async fn mark_published_stores_result_and_timestamp() {
        let (queue, clock) = test_queue(QueueConfig::default());

        let item = queue
            .enqueue(payload("p1"), RestaurantContext::default())
            .await
            .unwrap();
        queue.claim_next("w1").await.unwrap().unwrap();

        clock.advance(chrono::Duration::seconds(2));
        let published = queue.mark_published(item.id, naver_url("p1")).await.unwrap();

        assert_eq!(published.state, ItemState::Published);
        assert_eq!(
            published.result.as_ref().map(|r| r.naver_url.as_str()),
            Some("https://blog.naver.example/p1")
        );
        assert!(published.published_at.is_some());
    }

    #[tokio::test]
    async fn mark_published_outside_processing_leaves_row_unchanged() {
        let (queue, _clock) = test_queue(QueueConfig::default());

        let item = queue
            .enqueue(payload("p1"), RestaurantContext::default())
            .await
            .unwrap();

        // Still pending: wrong state.
        let err = queue
            .mark_published(item.id, naver_url("p1"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Conflict(_)));

        let unchanged = queue.get(item.id).await.unwrap().unwrap();
        assert_eq!(unchanged.state, ItemState::Pending);
        assert!(unchanged.result.is_none());
        assert_eq!(unchanged.updated_at, item.updated_at);
    }

    #[tokio::test]
    async fn mark_published_on_unknown_id_is_not_found() {
        let (queue, _clock) = test_queue(QueueConfig::default());
        let ids = UlidIdGenerator::new(SystemClock);

        let err = queue
            .mark_published(ids.generate_item_id(), naver_url("p1"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::NotFound { .. }));
    }

    /// The full lifecycle: claim races, retries, and exhaustion.
    #[tokio::test]
    async fn failure_chain_exhausts_the_budget() {
        let (queue, _clock) = test_queue(QueueConfig::default());

        let item = queue
            .enqueue(payload("p1"), RestaurantContext::default())
            .await
            .unwrap();
        assert_eq!(item.max_retries, 3);

        // Worker A claims; worker B sees nothing.
        let claimed = queue.claim_next("w1").await.unwrap().unwrap();
        assert_eq!(claimed.worker_key.as_deref(), Some("w1"));
        assert!(queue.claim_next("w2").await.unwrap().is_none());

        // First failure: back to pending with the budget decremented.
        let disposition = queue.mark_failed(item.id, "net error").await.unwrap();
        let record = match disposition {
            RetryDisposition::Requeued(r) => r,
            RetryDisposition::Exhausted(_) => panic!("budget not spent yet"),
        };
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.state, ItemState::Pending);
        assert_eq!(record.error_message.as_deref(), Some("net error"));

        // Two more failures exhaust the budget.
        queue.claim_next("w1").await.unwrap().unwrap();
        queue.mark_failed(item.id, "net error").await.unwrap();
        queue.claim_next("w1").await.unwrap().unwrap();
        let disposition = queue.mark_failed(item.id, "net error").await.unwrap();

        let record = match disposition {
            RetryDisposition::Exhausted(r) => r,
            RetryDisposition::Requeued(_) => panic!("budget should be spent"),
        };
        assert_eq!(record.retry_count, 3);
        assert_eq!(record.state, ItemState::Failed);
        assert_eq!(record.error_message.as_deref(), Some("net error"));

        // Terminal is terminal: nothing left to claim, no further retry.
        assert!(queue.claim_next("w1").await.unwrap().is_none());
        let err = queue.mark_failed(item.id, "again").await.unwrap_err();
        assert!(matches!(err, QueueError::ExhaustedRetries { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn updated_at_never_moves_backwards() {
        let (queue, clock) = test_queue(QueueConfig::default());

        let item = queue
            .enqueue(payload("p1"), RestaurantContext::default())
            .await
            .unwrap();
        let mut last = item.updated_at;

        clock.advance(chrono::Duration::seconds(1));
        let claimed = queue.claim_next("w1").await.unwrap().unwrap();
        assert!(claimed.updated_at >= last);
        last = claimed.updated_at;

        clock.advance(chrono::Duration::seconds(1));
        let disposition = queue.mark_failed(item.id, "e").await.unwrap();
        assert!(disposition.record().updated_at >= last);
    }

    #[tokio::test]
    async fn by_status_pages_newest_first_and_scan_restarts() {
        let (queue, clock) = test_queue(QueueConfig::default());

        let mut enqueued = Vec::new();
        for i in 0..5 {
            enqueued.push(
                queue
                    .enqueue(payload(&format!("p{i}")), RestaurantContext::default())
                    .await
                    .unwrap(),
            );
            clock.advance(chrono::Duration::seconds(1));
        }

        let mut scan = StatusScan::new(ItemState::Pending, 2);
        let mut seen = Vec::new();
        while !scan.is_done() {
            seen.extend(scan.next_page(&queue).await.unwrap());
        }

        let expected: Vec<ItemId> = enqueued.iter().rev().map(|r| r.id).collect();
        let got: Vec<ItemId> = seen.iter().map(|r| r.id).collect();
        assert_eq!(got, expected);

        // Restart yields the same sequence again.
        scan.restart();
        let first_again = scan.next_page(&queue).await.unwrap();
        assert_eq!(first_again[0].id, expected[0]);
    }

    #[tokio::test]
    async fn by_status_ignores_other_states() {
        let (queue, clock) = test_queue(QueueConfig::default());

        let item = queue
            .enqueue(payload("p1"), RestaurantContext::default())
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(1));
        queue
            .enqueue(payload("p2"), RestaurantContext::default())
            .await
            .unwrap();
        queue.claim_next("w1").await.unwrap();
        queue.mark_published(item.id, naver_url("p1")).await.unwrap();

        let page = queue
            .by_status_page(ItemState::Published, None, 10)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, item.id);
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn release_stale_requeues_orphaned_claims() {
        let (queue, clock) = test_queue(QueueConfig::default());

        let item = queue
            .enqueue(payload("p1"), RestaurantContext::default())
            .await
            .unwrap();
        queue.claim_next("w-dead").await.unwrap().unwrap();

        // A fresh claim is not stale yet.
        let released = queue
            .release_stale(chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(released, 0);

        clock.advance(chrono::Duration::minutes(10));
        let released = queue
            .release_stale(chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(released, 1);

        let record = queue.get(item.id).await.unwrap().unwrap();
        assert_eq!(record.state, ItemState::Pending);
        assert!(record.worker_key.is_none());
        // The orphaned attempt never reported an outcome, so the budget is intact.
        assert_eq!(record.retry_count, 0);

        // And the row is claimable again.
        let reclaimed = queue.claim_next("w2").await.unwrap().unwrap();
        assert_eq!(reclaimed.id, item.id);
        assert_eq!(reclaimed.worker_key.as_deref(), Some("w2"));
    }

    #[tokio::test]
    async fn restaurant_context_is_carried_on_the_row() {
        let (queue, _clock) = test_queue(QueueConfig::default());

        let context = RestaurantContext {
            name: Some("Mokmyeok Sundubu".into()),
            address: Some("Myeong-dong 8-gil".into()),
            naver_place_id: Some("place-100".into()),
            visit_count: 4,
        };
        let item = queue.enqueue(payload("p1"), context).await.unwrap();

        assert_eq!(item.restaurant.name.as_deref(), Some("Mokmyeok Sundubu"));
        assert_eq!(item.restaurant.visit_count, 4);
        assert_eq!(
            item.payload.category.as_deref(),
            Some(NaverResult::default_category())
        );
    }
}

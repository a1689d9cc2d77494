//! Queue item record: payload + retry bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ItemState;
use crate::domain::{ItemId, Platform, PlatformResult, PostPayload, RestaurantContext};

/// One row of the publish queue.
///
/// Design:
/// - This is the single source of truth for item state.
/// - Index structures in the store hold `(created_at, id)` keys only.
/// - Every state transition goes through a method here and calls `touch`,
///   so `updated_at` is never caller-settable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct QueueItemRecord<R: PlatformResult> {
    pub id: ItemId,

    /// Descriptive content, immutable after creation.
    pub payload: PostPayload,

    /// Denormalized restaurant context copied in at enqueue time.
    pub restaurant: RestaurantContext,

    pub state: ItemState,

    /// Failures reported so far.
    pub retry_count: u32,

    /// Failure budget; the item goes terminal once `retry_count` reaches it.
    pub max_retries: u32,

    /// Worker currently holding the claim (audit trail on terminal rows).
    pub worker_key: Option<String>,

    /// Platform result, populated on terminal success.
    pub result: Option<R>,

    /// Last failure description, kept across requeues.
    pub error_message: Option<String>,

    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<R: PlatformResult> QueueItemRecord<R> {
    pub fn new(
        id: ItemId,
        mut payload: PostPayload,
        restaurant: RestaurantContext,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Self {
        if payload.category.is_none() {
            payload.category = Some(R::default_category().to_string());
        }
        Self {
            id,
            payload,
            restaurant,
            state: ItemState::Pending,
            retry_count: 0,
            max_retries,
            worker_key: None,
            result: None,
            error_message: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn platform(&self) -> Platform {
        R::PLATFORM
    }

    /// Claim: Pending -> Processing, stamping the claimant.
    pub fn begin_processing(&mut self, worker_key: &str, now: DateTime<Utc>) {
        self.state = ItemState::Processing;
        self.worker_key = Some(worker_key.to_string());
        self.touch(now);
    }

    /// Terminal success: Processing -> Published.
    pub fn complete(&mut self, result: R, now: DateTime<Utc>) {
        self.state = ItemState::Published;
        self.result = Some(result);
        self.published_at = Some(now);
        self.touch(now);
    }

    /// Record one failed attempt. Returns `true` when the budget is spent
    /// and the item went terminal, `false` when it is claimable again.
    pub fn record_failure(&mut self, error: &str, now: DateTime<Utc>) -> bool {
        self.retry_count += 1;
        self.error_message = Some(error.to_string());
        let exhausted = self.retry_count >= self.max_retries;
        if exhausted {
            self.state = ItemState::Failed;
        } else {
            self.state = ItemState::Pending;
            self.worker_key = None;
        }
        self.touch(now);
        exhausted
    }

    /// Return an orphaned claim to the pool without spending the budget:
    /// the worker never reported an outcome for this attempt.
    pub fn release(&mut self, now: DateTime<Utc>) {
        self.state = ItemState::Pending;
        self.worker_key = None;
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::domain::{NaverResult, PostPayload, RestaurantContext};
    use chrono::TimeZone;
    use ulid::Ulid;

    fn record(clock: &FixedClock, max_retries: u32) -> QueueItemRecord<NaverResult> {
        QueueItemRecord::new(
            ItemId::from(Ulid::new()),
            PostPayload::new("p1", "t", "c"),
            RestaurantContext::default(),
            max_retries,
            clock.now(),
        )
    }

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn new_record_is_pending_with_zero_retries() {
        let clock = clock();
        let r = record(&clock, 3);

        assert_eq!(r.state, ItemState::Pending);
        assert_eq!(r.retry_count, 0);
        assert!(r.worker_key.is_none());
        assert_eq!(r.created_at, r.updated_at);
    }

    #[test]
    fn missing_category_defaults_per_platform() {
        let clock = clock();
        let r = record(&clock, 3);
        assert_eq!(
            r.payload.category.as_deref(),
            Some(NaverResult::default_category())
        );

        let explicit = QueueItemRecord::<NaverResult>::new(
            ItemId::from(Ulid::new()),
            PostPayload::new("p2", "t", "c").with_category("noodles"),
            RestaurantContext::default(),
            3,
            clock.now(),
        );
        assert_eq!(explicit.payload.category.as_deref(), Some("noodles"));
    }

    #[test]
    fn failure_below_budget_requeues_and_clears_claim() {
        let clock = clock();
        let mut r = record(&clock, 3);
        r.begin_processing("w1", clock.now());

        clock.advance(chrono::Duration::seconds(1));
        let exhausted = r.record_failure("net error", clock.now());

        assert!(!exhausted);
        assert_eq!(r.state, ItemState::Pending);
        assert_eq!(r.retry_count, 1);
        assert!(r.worker_key.is_none());
        assert_eq!(r.error_message.as_deref(), Some("net error"));
    }

    #[test]
    fn failure_at_budget_goes_terminal() {
        let clock = clock();
        let mut r = record(&clock, 1);
        r.begin_processing("w1", clock.now());

        let exhausted = r.record_failure("net error", clock.now());

        assert!(exhausted);
        assert_eq!(r.state, ItemState::Failed);
        // The claimant stays on the row for audit.
        assert_eq!(r.worker_key.as_deref(), Some("w1"));
    }

    #[test]
    fn release_does_not_spend_the_budget() {
        let clock = clock();
        let mut r = record(&clock, 3);
        r.begin_processing("w1", clock.now());

        clock.advance(chrono::Duration::minutes(10));
        r.release(clock.now());

        assert_eq!(r.state, ItemState::Pending);
        assert_eq!(r.retry_count, 0);
        assert!(r.worker_key.is_none());
    }

    #[test]
    fn every_transition_touches_updated_at() {
        let clock = clock();
        let mut r = record(&clock, 3);
        let mut last = r.updated_at;

        clock.advance(chrono::Duration::seconds(1));
        r.begin_processing("w1", clock.now());
        assert!(r.updated_at > last);
        last = r.updated_at;

        clock.advance(chrono::Duration::seconds(1));
        r.complete(
            NaverResult {
                naver_url: "https://blog.naver.example/p1".into(),
            },
            clock.now(),
        );
        assert!(r.updated_at > last);
        assert_eq!(r.published_at, Some(r.updated_at));
    }
}

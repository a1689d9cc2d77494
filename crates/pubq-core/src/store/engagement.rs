//! Engagement log: append-only like/view events.
//!
//! Events are only ever inserted and enumerated; counts are derived by
//! counting rows, never stored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::domain::PostId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementKind {
    Like,
    View,
}

/// One engagement row: a post id and a timestamp, nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub post_id: PostId,
    pub kind: EngagementKind,
    pub recorded_at: DateTime<Utc>,
}

/// In-memory append-only event store.
pub struct EngagementLog {
    events: Mutex<Vec<EngagementEvent>>,
    clock: Arc<dyn Clock>,
}

impl EngagementLog {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            clock,
        }
    }

    pub async fn record_like(&self, post_id: &PostId) -> EngagementEvent {
        self.record(post_id, EngagementKind::Like).await
    }

    pub async fn record_view(&self, post_id: &PostId) -> EngagementEvent {
        self.record(post_id, EngagementKind::View).await
    }

    async fn record(&self, post_id: &PostId, kind: EngagementKind) -> EngagementEvent {
        let event = EngagementEvent {
            post_id: post_id.clone(),
            kind,
            recorded_at: self.clock.now(),
        };
        let mut events = self.events.lock().await;
        events.push(event.clone());
        event
    }

    pub async fn like_count(&self, post_id: &PostId) -> usize {
        self.count(post_id, EngagementKind::Like).await
    }

    pub async fn view_count(&self, post_id: &PostId) -> usize {
        self.count(post_id, EngagementKind::View).await
    }

    async fn count(&self, post_id: &PostId, kind: EngagementKind) -> usize {
        let events = self.events.lock().await;
        events
            .iter()
            .filter(|e| e.kind == kind && &e.post_id == post_id)
            .count()
    }

    /// All events for one post, in insertion (= time) order.
    pub async fn events_for(&self, post_id: &PostId) -> Vec<EngagementEvent> {
        let events = self.events.lock().await;
        events
            .iter()
            .filter(|e| &e.post_id == post_id)
            .cloned()
            .collect()
    }
}

impl Default for EngagementLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_are_derived_from_rows() {
        let log = EngagementLog::new();
        let p1 = PostId::new("p1");
        let p2 = PostId::new("p2");

        log.record_like(&p1).await;
        log.record_like(&p1).await;
        log.record_view(&p1).await;
        log.record_view(&p2).await;

        assert_eq!(log.like_count(&p1).await, 2);
        assert_eq!(log.view_count(&p1).await, 1);
        assert_eq!(log.like_count(&p2).await, 0);
        assert_eq!(log.view_count(&p2).await, 1);
    }

    #[tokio::test]
    async fn events_keep_insertion_order() {
        let log = EngagementLog::new();
        let p1 = PostId::new("p1");

        log.record_view(&p1).await;
        log.record_like(&p1).await;

        let events = log.events_for(&p1).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EngagementKind::View);
        assert_eq!(events[1].kind, EngagementKind::Like);
        assert!(events[0].recorded_at <= events[1].recorded_at);
    }
}

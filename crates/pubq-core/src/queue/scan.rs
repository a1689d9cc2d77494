//! Keyset pagination over queue listings.
//!
//! `byStatus` must behave as a lazy, restartable sequence without holding
//! the store lock while the caller consumes it, so listing is cut into
//! keyset pages: each page remembers the last `(created_at, id)` seen and
//! the next page resumes strictly after it (descending order).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemState, PublishQueue, QueueItemRecord};
use crate::domain::{ItemId, PlatformResult};
use crate::error::QueueError;

/// Resume point: the last row of the previous page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageToken {
    pub created_at: DateTime<Utc>,
    pub id: ItemId,
}

impl PageToken {
    pub fn of<R: PlatformResult>(record: &QueueItemRecord<R>) -> Self {
        Self {
            created_at: record.created_at,
            id: record.id,
        }
    }
}

/// One page of a status listing.
#[derive(Debug, Clone)]
pub struct Page<R: PlatformResult> {
    pub items: Vec<QueueItemRecord<R>>,

    /// Absent when this was the last page.
    pub next: Option<PageToken>,
}

/// Restartable cursor over all rows in one state, newest first.
///
/// Holds no reference to the queue; each page is fetched against whatever
/// queue the caller passes in, so the scan survives across polls.
#[derive(Debug, Clone)]
pub struct StatusScan {
    status: ItemState,
    page_size: usize,
    cursor: Option<PageToken>,
    done: bool,
}

impl StatusScan {
    pub fn new(status: ItemState, page_size: usize) -> Self {
        Self {
            status,
            page_size,
            cursor: None,
            done: false,
        }
    }

    /// Rewind to the beginning of the sequence.
    pub fn restart(&mut self) {
        self.cursor = None;
        self.done = false;
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Fetch the next page; empty once the sequence is exhausted.
    pub async fn next_page<R: PlatformResult>(
        &mut self,
        queue: &dyn PublishQueue<R>,
    ) -> Result<Vec<QueueItemRecord<R>>, QueueError> {
        if self.done {
            return Ok(Vec::new());
        }
        let page = queue
            .by_status_page(self.status, self.cursor, self.page_size)
            .await?;
        self.cursor = page.next;
        if self.cursor.is_none() {
            self.done = true;
        }
        Ok(page.items)
    }
}

//! Guestbook store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::domain::{EntryId, GuestbookEntry, IdGenerator, UlidIdGenerator};
use crate::error::QueueError;

/// In-memory guestbook. Entries are append-only except for attaching a
/// single reply.
pub struct Guestbook {
    entries: Mutex<HashMap<EntryId, GuestbookEntry>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl Guestbook {
    pub fn new() -> Self {
        Self::with_parts(
            Arc::new(SystemClock),
            Arc::new(UlidIdGenerator::new(SystemClock)),
        )
    }

    pub fn with_parts(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            ids,
        }
    }

    pub async fn leave(&self, nickname: &str, message: &str) -> Result<GuestbookEntry, QueueError> {
        if nickname.trim().is_empty() {
            return Err(QueueError::validation("nickname must not be empty"));
        }
        if message.trim().is_empty() {
            return Err(QueueError::validation("message must not be empty"));
        }

        let mut entries = self.entries.lock().await;
        let entry = GuestbookEntry::new(
            self.ids.generate_entry_id(),
            nickname,
            message,
            self.clock.now(),
        );
        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    pub async fn attach_reply(
        &self,
        id: EntryId,
        reply: &str,
    ) -> Result<GuestbookEntry, QueueError> {
        if reply.trim().is_empty() {
            return Err(QueueError::validation("reply must not be empty"));
        }

        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| QueueError::not_found("guestbook entry", id))?;
        entry.attach_reply(reply)?;
        Ok(entry.clone())
    }

    pub async fn get(&self, id: EntryId) -> Option<GuestbookEntry> {
        let entries = self.entries.lock().await;
        entries.get(&id).cloned()
    }

    /// All entries, newest first.
    pub async fn entries(&self) -> Vec<GuestbookEntry> {
        let entries = self.entries.lock().await;
        let mut all: Vec<GuestbookEntry> = entries.values().cloned().collect();
        all.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        all
    }
}

impl Default for Guestbook {
    fn default() -> Self {
        Self::new()
    }
}

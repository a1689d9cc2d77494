//! Guestbook entry: immutable once written, except for attaching one reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::EntryId;
use crate::error::QueueError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestbookEntry {
    pub id: EntryId,
    pub nickname: String,
    pub message: String,
    pub reply: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GuestbookEntry {
    pub fn new(
        id: EntryId,
        nickname: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            message: message.into(),
            reply: None,
            created_at: now,
        }
    }

    /// A reply can be attached exactly once.
    pub fn attach_reply(&mut self, reply: impl Into<String>) -> Result<(), QueueError> {
        if self.reply.is_some() {
            return Err(QueueError::conflict(format!(
                "entry {} already has a reply",
                self.id
            )));
        }
        self.reply = Some(reply.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn reply_attaches_once() {
        let mut entry =
            GuestbookEntry::new(EntryId::from(Ulid::new()), "guest", "nice place", Utc::now());

        entry.attach_reply("thank you!").unwrap();
        assert_eq!(entry.reply.as_deref(), Some("thank you!"));

        let err = entry.attach_reply("again").unwrap_err();
        assert!(matches!(err, QueueError::Conflict(_)));
        assert_eq!(entry.reply.as_deref(), Some("thank you!"));
    }
}

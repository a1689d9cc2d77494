use thiserror::Error;

use crate::domain::ItemId;

/// Store-level errors.
///
/// The store surfaces these to the caller and never retries on its own;
/// retry orchestration belongs to the worker. `Conflict` in particular is
/// not a hard failure. It means the caller lost a race or the row is in the
/// wrong state, and should re-read and decide.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("retries exhausted for item {id} after {attempts} attempts")]
    ExhaustedRetries { id: ItemId, attempts: u32 },
}

impl QueueError {
    pub fn validation(msg: impl Into<String>) -> Self {
        QueueError::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        QueueError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        QueueError::Conflict(msg.into())
    }
}

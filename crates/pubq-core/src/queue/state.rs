//! Item state machine for the publish queue.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Publish-queue item state.
///
/// State transitions:
/// - Pending -> Processing (exclusive worker claim)
/// - Processing -> Published (terminal success)
/// - Processing -> Pending (failure with retries remaining)
/// - Processing -> Failed (terminal, retries exhausted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Waiting to be claimed.
    Pending,

    /// Claimed by a worker, publication in flight.
    Processing,

    /// Published to the external platform (terminal).
    Published,

    /// Retries exhausted (terminal).
    Failed,
}

impl ItemState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemState::Published | ItemState::Failed)
    }

    /// Is this item eligible for a worker claim?
    pub fn is_claimable(self) -> bool {
        matches!(self, ItemState::Pending)
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemState::Pending => "pending",
            ItemState::Processing => "processing",
            ItemState::Published => "published",
            ItemState::Failed => "failed",
        };
        s.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::pending(ItemState::Pending, false, true)]
    #[case::processing(ItemState::Processing, false, false)]
    #[case::published(ItemState::Published, true, false)]
    #[case::failed(ItemState::Failed, true, false)]
    fn predicates(#[case] state: ItemState, #[case] terminal: bool, #[case] claimable: bool) {
        assert_eq!(state.is_terminal(), terminal);
        assert_eq!(state.is_claimable(), claimable);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ItemState::Processing).unwrap(),
            "\"processing\""
        );
    }
}

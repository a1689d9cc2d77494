//! Publishing targets and their result shapes.
//!
//! The two queue variants are structurally identical apart from the
//! platform-specific result fields and the default category, so the queue is
//! generic over `R: PlatformResult` instead of being duplicated per target.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// External publishing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Naver,
    Instagram,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Naver => "naver".fmt(f),
            Platform::Instagram => "instagram".fmt(f),
        }
    }
}

/// Platform-specific terminal-success data stored on the queue row.
///
/// # Trait bounds
/// - `Serialize + DeserializeOwned`: results are part of the persisted row
/// - `Send + Sync + 'static`: rows cross worker task boundaries
pub trait PlatformResult:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const PLATFORM: Platform;

    /// Category applied when the enqueued payload does not set one.
    fn default_category() -> &'static str;
}

/// Result of a successful Naver blog publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NaverResult {
    pub naver_url: String,
}

impl PlatformResult for NaverResult {
    const PLATFORM: Platform = Platform::Naver;

    fn default_category() -> &'static str {
        "restaurant-review"
    }
}

/// Result of a successful Instagram publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstagramResult {
    pub instagram_url: String,
    pub instagram_media_id: String,
}

impl PlatformResult for InstagramResult {
    const PLATFORM: Platform = Platform::Instagram;

    fn default_category() -> &'static str {
        "food"
    }
}

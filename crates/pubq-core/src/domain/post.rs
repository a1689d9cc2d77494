//! Post payload: the descriptive content queued for publication.
//!
//! The payload is set at enqueue time and never mutated afterwards; only the
//! queue bookkeeping around it changes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::QueueError;

/// Identifier of the source content, supplied by the caller.
///
/// Not generated here and not unique by default: whether a post may be
/// enqueued twice is a queue configuration knob, not a payload property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(String);

impl PostId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Content to publish: required identity fields plus optional media/metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostPayload {
    pub post_id: PostId,
    pub title: String,
    pub content: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default)]
    pub images: Vec<String>,

    /// Falls back to the platform default when absent.
    #[serde(default)]
    pub category: Option<String>,
}

impl PostPayload {
    pub fn new(
        post_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            post_id: PostId::new(post_id),
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            image_url: None,
            images: Vec::new(),
            category: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Required fields must be present before a row is created.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.post_id.as_str().trim().is_empty() {
            return Err(QueueError::validation("post_id must not be empty"));
        }
        if self.title.trim().is_empty() {
            return Err(QueueError::validation("title must not be empty"));
        }
        if self.content.trim().is_empty() {
            return Err(QueueError::validation("content must not be empty"));
        }
        Ok(())
    }
}

/// Restaurant context denormalized into the queue row at enqueue time.
///
/// Deliberately not foreign-key enforced: the copy is best-effort and may
/// drift from the directory record it was taken from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestaurantContext {
    pub name: Option<String>,
    pub address: Option<String>,
    pub naver_place_id: Option<String>,
    pub visit_count: u32,
}

impl RestaurantContext {
    pub fn from_record(record: &crate::domain::RestaurantRecord) -> Self {
        Self {
            name: Some(record.name.clone()),
            address: record.address.clone(),
            naver_place_id: Some(record.naver_place_id.clone()),
            visit_count: record.visit_count,
        }
    }
}

//! Restaurant directory: upsert-by-place-id store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::domain::{IdGenerator, RestaurantId, RestaurantRecord, UlidIdGenerator};
use crate::error::QueueError;

struct DirectoryState {
    records: HashMap<RestaurantId, RestaurantRecord>,

    /// `naver_place_id` is globally unique; this index enforces it.
    by_place_id: HashMap<String, RestaurantId>,
}

/// In-memory restaurant store.
///
/// Enqueuing content for a place that already exists must update the
/// existing record, never duplicate it, so the only write paths are
/// `upsert` and `record_visit`.
pub struct RestaurantDirectory {
    state: Mutex<DirectoryState>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl RestaurantDirectory {
    pub fn new() -> Self {
        Self::with_parts(
            Arc::new(SystemClock),
            Arc::new(UlidIdGenerator::new(SystemClock)),
        )
    }

    pub fn with_parts(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Mutex::new(DirectoryState {
                records: HashMap::new(),
                by_place_id: HashMap::new(),
            }),
            clock,
            ids,
        }
    }

    /// Insert a new record for an unknown place id, or refresh the
    /// descriptive fields of the existing one.
    pub async fn upsert(
        &self,
        name: &str,
        address: Option<&str>,
        naver_place_id: &str,
    ) -> Result<RestaurantRecord, QueueError> {
        if name.trim().is_empty() {
            return Err(QueueError::validation("restaurant name must not be empty"));
        }
        if naver_place_id.trim().is_empty() {
            return Err(QueueError::validation("naver_place_id must not be empty"));
        }

        let mut state = self.state.lock().await;
        let now = self.clock.now();

        if let Some(&id) = state.by_place_id.get(naver_place_id) {
            let record = state
                .records
                .get_mut(&id)
                .ok_or_else(|| QueueError::not_found("restaurant", id))?;
            record.update_details(name, address.map(str::to_string), now);
            return Ok(record.clone());
        }

        let id = self.ids.generate_restaurant_id();
        let record = RestaurantRecord::new(
            id,
            name,
            address.map(str::to_string),
            naver_place_id,
            now,
        );
        state.by_place_id.insert(naver_place_id.to_string(), id);
        state.records.insert(id, record.clone());
        Ok(record)
    }

    /// Increment the visit counter for a known place.
    pub async fn record_visit(&self, naver_place_id: &str) -> Result<RestaurantRecord, QueueError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let id = *state
            .by_place_id
            .get(naver_place_id)
            .ok_or_else(|| QueueError::not_found("restaurant", naver_place_id))?;
        let record = state
            .records
            .get_mut(&id)
            .ok_or_else(|| QueueError::not_found("restaurant", id))?;
        record.record_visit(now);
        Ok(record.clone())
    }

    pub async fn get(&self, id: RestaurantId) -> Option<RestaurantRecord> {
        let state = self.state.lock().await;
        state.records.get(&id).cloned()
    }

    pub async fn by_place_id(&self, naver_place_id: &str) -> Option<RestaurantRecord> {
        let state = self.state.lock().await;
        let id = state.by_place_id.get(naver_place_id)?;
        state.records.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for RestaurantDirectory {
    fn default() -> Self {
        Self::new()
    }
}

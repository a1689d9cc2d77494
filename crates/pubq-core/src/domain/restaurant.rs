//! Restaurant record.
//!
//! All mutation goes through methods that refresh `updated_at`; callers
//! never set timestamps directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RestaurantId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantRecord {
    pub id: RestaurantId,
    pub name: String,
    pub address: Option<String>,

    /// Globally unique business key; upserts are keyed on this.
    pub naver_place_id: String,

    /// Monotonic counter, incremented externally via the directory.
    pub visit_count: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RestaurantRecord {
    pub fn new(
        id: RestaurantId,
        name: impl Into<String>,
        address: Option<String>,
        naver_place_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            address,
            naver_place_id: naver_place_id.into(),
            visit_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh the descriptive fields (upsert on an existing place id).
    pub fn update_details(
        &mut self,
        name: impl Into<String>,
        address: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.name = name.into();
        self.address = address;
        self.touch(now);
    }

    /// Count one more visit. The counter only ever goes up.
    pub fn record_visit(&mut self, now: DateTime<Utc>) {
        self.visit_count += 1;
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
    use crate::domain::ids::{IdGenerator, UlidIdGenerator};
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap())
    }

    #[test]
    fn new_record_starts_with_zero_visits() {
        let clock = clock();
        let ids = UlidIdGenerator::new(clock.clone());
        let record = RestaurantRecord::new(
            ids.generate_restaurant_id(),
            "Mokmyeok Sundubu",
            Some("Myeong-dong 8-gil".into()),
            "place-100",
            clock.now(),
        );

        assert_eq!(record.visit_count, 0);
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn visits_are_monotonic_and_touch_updated_at() {
        let clock = clock();
        let ids = UlidIdGenerator::new(clock.clone());
        let mut record = RestaurantRecord::new(
            ids.generate_restaurant_id(),
            "Mokmyeok Sundubu",
            None,
            "place-100",
            clock.now(),
        );

        clock.advance(chrono::Duration::minutes(5));
        record.record_visit(clock.now());
        clock.advance(chrono::Duration::minutes(5));
        record.record_visit(clock.now());

        assert_eq!(record.visit_count, 2);
        assert!(record.updated_at > record.created_at);
    }
}

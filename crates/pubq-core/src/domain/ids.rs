//! Domain identifiers (strongly-typed ULID ids).
//!
//! `Id<T>` shares one implementation across all id types; the phantom marker
//! keeps an `ItemId` and a `RestaurantId` from mixing at compile time. ULIDs
//! carry their creation timestamp up front, so ids sort by creation order,
//! which the queue uses to break claim-ordering ties.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

use crate::clock::Clock;

/// Marker trait for id types; supplies the `Display` prefix.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic id over a marker type.
///
/// `PhantomData` costs nothing at runtime; the marker exists purely for
/// compile-time separation.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Marker for queued publish items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Item {}

impl IdMarker for Item {
    fn prefix() -> &'static str {
        "item-"
    }
}

/// Marker for restaurant records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Restaurant {}

impl IdMarker for Restaurant {
    fn prefix() -> &'static str {
        "restaurant-"
    }
}

/// Marker for guestbook entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entry {}

impl IdMarker for Entry {
    fn prefix() -> &'static str {
        "entry-"
    }
}

/// Identifier of a queued publish item.
pub type ItemId = Id<Item>;

/// Identifier of a restaurant record.
pub type RestaurantId = Id<Restaurant>;

/// Identifier of a guestbook entry.
pub type EntryId = Id<Entry>;

/// Generates fresh ids for the stores.
///
/// Abstracted as a trait so tests can substitute a deterministic source.
pub trait IdGenerator: Send + Sync {
    fn generate_item_id(&self) -> ItemId;

    fn generate_restaurant_id(&self) -> RestaurantId;

    fn generate_entry_id(&self) -> EntryId;
}

/// ULID-based generator: clock-driven timestamp part, random entropy part.
pub struct UlidIdGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidIdGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidIdGenerator<C> {
    fn generate_item_id(&self) -> ItemId {
        ItemId::from(self.next_ulid())
    }

    fn generate_restaurant_id(&self) -> RestaurantId {
        RestaurantId::from(self.next_ulid())
    }

    fn generate_entry_id(&self) -> EntryId {
        EntryId::from(self.next_ulid())
    }
}

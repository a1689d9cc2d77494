//! Domain model (ids, payloads, platform results, records).

pub mod guestbook;
pub mod ids;
pub mod platform;
pub mod post;
pub mod restaurant;

pub use guestbook::GuestbookEntry;
pub use ids::{EntryId, IdGenerator, ItemId, RestaurantId, UlidIdGenerator};
pub use platform::{InstagramResult, NaverResult, Platform, PlatformResult};
pub use post::{PostId, PostPayload, RestaurantContext};
pub use restaurant::RestaurantRecord;

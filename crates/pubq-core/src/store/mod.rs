//! Auxiliary stores: restaurant directory, engagement log, guestbook.

mod engagement;
mod guestbook;
mod restaurants;

pub use engagement::{EngagementEvent, EngagementKind, EngagementLog};
pub use guestbook::Guestbook;
pub use restaurants::RestaurantDirectory;

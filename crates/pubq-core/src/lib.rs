//! pubq-core
//!
//! Coordination layer for a small content-publishing pipeline: restaurant
//! posts are queued for asynchronous publication to external platforms and
//! picked up by independent polling workers.
//!
//! # Module map
//! - **domain**: ids, payloads, platform results, restaurant/guestbook records
//! - **queue**: publish-queue state machine, in-memory store, pagination
//! - **store**: restaurant directory, engagement log, guestbook
//! - **worker**: polling worker group and the stale-claim sweeper
//! - **clock**: time port (SystemClock for production, FixedClock for tests)
//! - **observability**: per-state queue counts
//! - **error**: crate-wide error type

pub mod clock;
pub mod domain;
pub mod error;
pub mod observability;
pub mod queue;
pub mod store;
pub mod worker;

//! Domain layer for board-feed: pure types with no I/O.

pub mod backoff;
pub mod config;
pub mod state;

pub use backoff::Backoff;
pub use config::FeedConfig;
pub use state::{FeedEvent, FeedState};

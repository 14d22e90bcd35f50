//! Infrastructure layer for board-feed: the WebSocket connection loop.

pub mod client;

pub use client::{FeedClient, FeedError};

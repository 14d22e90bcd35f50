//! # board-feed
//!
//! Viewer-side client for the status board's WebSocket push feed.
//!
//! A display must keep showing *something* while the server restarts, the
//! Wi-Fi drops, or a push frame is silently lost.  This crate wraps the feed
//! in a small resilience state machine:
//!
//! ```text
//!            connect_started            subscribed
//! Disconnected ─────────────▶ Connecting ─────────▶ Subscribed
//!      ▲                          │                      │
//!      └──────── failed ──────────┴──────── failed ──────┘
//!                 (wait for the backoff delay, then connect again)
//! ```
//!
//! While subscribed, the client asks for a fresh snapshot every re-sync
//! interval; a server that does not answer within the response timeout is
//! treated as gone.
//!
//! # Crate layout
//!
//! - **`domain`** – [`FeedState`] transitions, [`Backoff`], [`FeedConfig`].
//! - **`application`** – [`RevisionTracker`]: decides which frames update
//!   the displayed document.
//! - **`infrastructure`** – [`FeedClient`]: the WebSocket connection loop.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{FrameOutcome, RevisionTracker};
pub use domain::{Backoff, FeedConfig, FeedEvent, FeedState};
pub use infrastructure::{FeedClient, FeedError};

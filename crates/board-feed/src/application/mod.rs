//! Application layer for board-feed.
//!
//! - **`tracker`** – [`RevisionTracker`]: classifies each server frame and
//!   filters out snapshots that are not newer than the one already shown.

pub mod tracker;

pub use tracker::{FrameOutcome, RevisionTracker};

//! Domain types for the status board.
//!
//! Everything in here is pure: no I/O, no clocks, no async.  The settings
//! server and the feed client both depend on these definitions so that the
//! normalization rules can never drift apart between the two sides.

pub mod progress;
pub mod settings;

pub use progress::Progress;
pub use settings::{normalize, Settings, Slide};

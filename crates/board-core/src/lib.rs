//! # board-core
//!
//! Shared library for the status board containing the settings document,
//! its normalization rules, and the frames exchanged on the push feed.
//!
//! This crate is used by both the settings server and the viewer feed client.
//! It has zero dependencies on sockets, async runtimes, or the file system.
//!
//! # Architecture overview
//!
//! The status board shows a fundraising goal, the amount raised so far, and a
//! rotating set of slides.  An admin edits the single settings document on the
//! server; every open display picks the change up within seconds.
//!
//! - **`domain`** – The [`Settings`] document, the [`normalize`] function that
//!   turns any JSON candidate into a fully-populated document, and the display
//!   figures ([`Progress`]) derived from it.
//!
//! - **`protocol`** – The JSON frames sent over the WebSocket push feed and the
//!   codec that encodes and decodes them.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `board_core::Settings` instead of `board_core::domain::settings::Settings`.
pub use domain::progress::{Progress, MIN_SLIDE_SECONDS};
pub use domain::settings::{normalize, Settings, Slide};
pub use protocol::codec::{decode_frame, encode_frame, ProtocolError};
pub use protocol::messages::{ClientFrame, ServerFrame};

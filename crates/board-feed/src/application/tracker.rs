//! Per-connection frame classification.
//!
//! The server numbers every commit.  Within one connection the numbers only
//! grow, but a re-sync reply may repeat a revision the client already has,
//! and a late update can race a re-sync.  [`RevisionTracker`] keeps the
//! newest revision seen on the current connection and reports which frames
//! carry something new.
//!
//! Revisions restart when the server restarts, so the tracker is reset on
//! every new connection and the first snapshot is always accepted.

use board_core::{decode_frame, ServerFrame, Settings};

/// What one text frame from the server means for the viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// A newer document to show.
    Update { revision: u64, settings: Settings },
    /// A snapshot the viewer already has.  Still proves the server is alive.
    Stale { revision: u64 },
    /// Reply to a ping.
    Pong { token: u64 },
    /// The server rejected something the client sent.
    ServerError(String),
    /// Not a frame this client understands; ignored.
    Malformed(String),
}

impl FrameOutcome {
    /// `true` for any snapshot frame, new or not.
    pub fn is_snapshot(&self) -> bool {
        matches!(self, FrameOutcome::Update { .. } | FrameOutcome::Stale { .. })
    }
}

/// Remembers the newest revision on the current connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionTracker {
    last: Option<u64>,
}

impl RevisionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the last revision; the next snapshot is accepted.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn last_revision(&self) -> Option<u64> {
        self.last
    }

    /// Decodes `text` and classifies it, advancing the tracker for a newer
    /// snapshot.
    pub fn classify(&mut self, text: &str) -> FrameOutcome {
        match decode_frame::<ServerFrame>(text) {
            Ok(ServerFrame::Settings { revision, settings }) => {
                if self.last.is_some_and(|last| revision <= last) {
                    FrameOutcome::Stale { revision }
                } else {
                    self.last = Some(revision);
                    FrameOutcome::Update { revision, settings }
                }
            }
            Ok(ServerFrame::Pong { token }) => FrameOutcome::Pong { token },
            Ok(ServerFrame::Error { message }) => FrameOutcome::ServerError(message),
            Err(e) => FrameOutcome::Malformed(e.to_string()),
        }
    }
}

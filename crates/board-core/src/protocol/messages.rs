//! JSON frames exchanged on the WebSocket push feed.
//!
//! # Message flow
//!
//! ```text
//! Server → Viewer:  ServerFrame  →  JSON text frame
//! Viewer → Server:  JSON text frame  →  ClientFrame
//! ```
//!
//! Every frame is a JSON object with a `"type"` field naming the variant; the
//! remaining fields are flattened into the same object:
//!
//! ```json
//! {"type":"Settings","revision":3,"settings":{"goalAmount":5000.0, ...}}
//! {"type":"Resync"}
//! ```
//!
//! One WebSocket text frame carries exactly one message, so consumers never
//! need to split or reassemble payloads.

use serde::{Deserialize, Serialize};

use crate::domain::settings::Settings;

/// Frames the server sends to a viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// A full settings document.
    ///
    /// The first frame on every connection is the snapshot taken when the
    /// viewer registered; every later one is a committed update or the reply
    /// to a [`ClientFrame::Resync`].
    Settings {
        /// Server-local commit counter.  Strictly increases with every accepted
        /// write while the server process lives; restarts at 0 with it.
        revision: u64,
        /// The normalized document.
        settings: Settings,
    },

    /// Reply to [`ClientFrame::Ping`], echoing its token.
    Pong { token: u64 },

    /// The server could not understand a frame the viewer sent.
    Error { message: String },
}

/// Frames a viewer sends to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Asks the server to send the current snapshot again.
    ///
    /// Viewers send this periodically to bound staleness if a pushed update
    /// was lost somewhere between the server and the display.
    Resync,

    /// Application-level liveness probe.
    Ping { token: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_frame_is_tagged_with_type() {
        let frame = ServerFrame::Settings {
            revision: 7,
            settings: Settings::default(),
        };
        let value = serde_json::to_value(&frame).expect("serialize");
        assert_eq!(value["type"], json!("Settings"));
        assert_eq!(value["revision"], json!(7));
        assert_eq!(value["settings"]["currency"], json!("EUR"));
    }

    #[test]
    fn test_resync_frame_parses_from_bare_type() {
        let frame: ClientFrame = serde_json::from_str(r#"{"type":"Resync"}"#).expect("parse");
        assert_eq!(frame, ClientFrame::Resync);
    }

    #[test]
    fn test_ping_frame_carries_token() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"Ping","token":99}"#).expect("parse");
        assert_eq!(frame, ClientFrame::Ping { token: 99 });
    }

    #[test]
    fn test_settings_frame_with_partial_document_decodes_normalized() {
        // A partial document inside a frame must still produce a full Settings.
        let text = r#"{"type":"Settings","revision":1,"settings":{"raisedAmount":40}}"#;
        let frame: ServerFrame = serde_json::from_str(text).expect("parse");
        match frame {
            ServerFrame::Settings { revision, settings } => {
                assert_eq!(revision, 1);
                assert_eq!(settings.raised_amount, 40.0);
                assert_eq!(settings.slides, Settings::default().slides);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

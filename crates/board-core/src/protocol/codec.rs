//! Text codec for push-feed frames.
//!
//! Frames are plain JSON.  The codec exists so both ends share one error type
//! and so a malformed frame is reported with a readable reason instead of a
//! raw `serde_json::Error`.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The text is not valid JSON, or does not match any known frame.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The frame could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

/// Encodes a frame into the JSON text sent on the wire.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use board_core::{decode_frame, encode_frame, ClientFrame};
///
/// let text = encode_frame(&ClientFrame::Resync).unwrap();
/// let back: ClientFrame = decode_frame(&text).unwrap();
/// assert_eq!(back, ClientFrame::Resync);
/// ```
pub fn encode_frame<T: Serialize>(frame: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(frame).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Decodes one frame from its JSON text.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] if the text is not valid JSON or
/// has an unknown `type`.
pub fn decode_frame<T: DeserializeOwned>(text: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{ClientFrame, ServerFrame};

    #[test]
    fn test_decode_invalid_json_returns_malformed_frame() {
        let result: Result<ClientFrame, _> = decode_frame("{not json");
        assert!(matches!(result, Err(ProtocolError::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_unknown_type_returns_malformed_frame() {
        let result: Result<ClientFrame, _> = decode_frame(r#"{"type":"Teleport"}"#);
        assert!(matches!(result, Err(ProtocolError::MalformedFrame(_))));
    }

    #[test]
    fn test_encoded_frame_is_single_line() {
        // Escaped newlines only; the frame itself stays on one line.
        let text = encode_frame(&ServerFrame::Error {
            message: "bad\nframe".to_string(),
        })
        .expect("encode");
        assert!(!text.contains('\n'));
    }
}

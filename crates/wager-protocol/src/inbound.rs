//! Client → server messages and their two-stage decoding.
//!
//! The only message a client sends is `{"type": "GUESS", "payload":
//! {"value": <integer>}}`. Decoding happens in two passes so the server
//! can tell "I don't know this message" apart from "I know it, but the
//! value is bad":
//!
//! 1. Read just the `type` tag. Anything unreadable, or any tag other
//!    than `GUESS`, is an unknown message type.
//! 2. Read the guess payload. A missing, fractional, or non-numeric
//!    value is an invalid guess value.

use serde::{Deserialize, Serialize};

use crate::{Codec, ErrorCode};

/// A well-formed message from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    #[serde(rename = "GUESS")]
    Guess { value: i64 },
}

/// Why an inbound frame was rejected. The connection stays open.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InboundError {
    #[error("Unknown message type")]
    UnknownMessageType(Option<String>),

    #[error("Invalid guess value")]
    InvalidGuessValue,
}

impl InboundError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownMessageType(_) => ErrorCode::UnknownMessageType,
            Self::InvalidGuessValue => ErrorCode::InvalidGuessValue,
        }
    }
}

/// Just the tag. Unknown fields are ignored at this stage.
#[derive(Deserialize)]
struct FrameHeader {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct GuessFrame {
    payload: GuessPayload,
}

#[derive(Deserialize)]
struct GuessPayload {
    value: GuessValue,
}

/// Clients built on form inputs send numbers as strings; both are
/// accepted as long as they hold a whole number.
#[derive(Deserialize)]
#[serde(untagged)]
enum GuessValue {
    Number(i64),
    Text(String),
}

impl ClientMessage {
    /// Decodes a raw frame into a [`ClientMessage`].
    ///
    /// # Errors
    /// - [`InboundError::UnknownMessageType`] if the frame can't be read
    ///   or its `type` isn't `GUESS`.
    /// - [`InboundError::InvalidGuessValue`] if the payload doesn't hold a
    ///   single integer.
    pub fn decode<C: Codec>(codec: &C, data: &[u8]) -> Result<Self, InboundError> {
        let header: FrameHeader = codec
            .decode(data)
            .map_err(|_| InboundError::UnknownMessageType(None))?;

        match header.kind.as_deref() {
            Some("GUESS") => {}
            _ => return Err(InboundError::UnknownMessageType(header.kind)),
        }

        let frame: GuessFrame = codec
            .decode(data)
            .map_err(|_| InboundError::InvalidGuessValue)?;

        let value = match frame.payload.value {
            GuessValue::Number(n) => n,
            GuessValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| InboundError::InvalidGuessValue)?,
        };

        Ok(Self::Guess { value })
    }
}

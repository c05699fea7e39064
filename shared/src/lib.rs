//! Wire contract shared by the relay server and the terminal client.
//!
//! Every record exchanged on a connection is an [`Envelope`]: a type tag, the
//! identity of the sender and a text payload. Envelopes travel as
//! length-prefixed bincode frames, see [`codec::EnvelopeCodec`].

pub mod codec;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use codec::{CodecError, EnvelopeCodec};

pub const DEFAULT_PORT: u16 = 8080;
pub const SERVER_SENDER: &str = "[Server]";
pub const AUTHORISED: &str = "Authorised";
pub const UNAUTHORISED: &str = "Unauthorised";
pub const JOINED: &str = "Joined";
pub const DISCONNECTED: &str = "Disconnected";

/// Longest chat payload accepted, counted in characters.
pub const MAX_PAYLOAD_CHARS: usize = 256;
/// Largest encoded frame either peer will accept.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Auth,
    Chat,
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub kind: MessageKind,
    pub sender: String,
    pub payload: String,
}

impl Envelope {
    pub fn new(kind: MessageKind, sender: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind,
            sender: sender.into(),
            payload: payload.into(),
        }
    }

    pub fn auth(sender: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(MessageKind::Auth, sender, token)
    }

    pub fn chat(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageKind::Chat, sender, text)
    }

    pub fn error(sender: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, sender, description)
    }

    /// Envelope originated by the server itself rather than relayed.
    pub fn server(kind: MessageKind, payload: impl Into<String>) -> Self {
        Self::new(kind, SERVER_SENDER, payload)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload should be a non-empty string")]
    Empty,
    #[error("payload contains control character {0:?}")]
    ControlCharacter(char),
    #[error("payload is {len} characters long, the limit is {max}")]
    TooLong { len: usize, max: usize },
}

/// Checks that a chat payload is displayable text within the size limit.
pub fn validate_chat_payload(payload: &str) -> Result<(), PayloadError> {
    if payload.is_empty() {
        return Err(PayloadError::Empty);
    }

    if let Some(c) = payload.chars().find(|c| c.is_control() && *c != '\t') {
        return Err(PayloadError::ControlCharacter(c));
    }

    let len = payload.chars().count();
    if len > MAX_PAYLOAD_CHARS {
        return Err(PayloadError::TooLong {
            len,
            max: MAX_PAYLOAD_CHARS,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_constructors() {
        let auth = Envelope::auth("alice", "tok");
        assert_eq!(auth.kind, MessageKind::Auth);
        assert_eq!(auth.sender, "alice");
        assert_eq!(auth.payload, "tok");

        let chat = Envelope::chat("bob", "hi");
        assert_eq!(chat.kind, MessageKind::Chat);

        let error = Envelope::error(SERVER_SENDER, "bad");
        assert_eq!(error.kind, MessageKind::Error);
    }

    #[test]
    fn test_server_envelope_sender() {
        let reply = Envelope::server(MessageKind::Auth, AUTHORISED);
        assert_eq!(reply.sender, SERVER_SENDER);
        assert_eq!(reply.payload, AUTHORISED);
    }

    #[test]
    fn test_validate_accepts_plain_text() {
        assert!(validate_chat_payload("hi").is_ok());
        assert!(validate_chat_payload("tab\tseparated").is_ok());
        assert!(validate_chat_payload("привет, мир").is_ok());
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert_eq!(validate_chat_payload(""), Err(PayloadError::Empty));
    }

    #[test]
    fn test_validate_rejects_control_characters() {
        assert_eq!(
            validate_chat_payload("line\nbreak"),
            Err(PayloadError::ControlCharacter('\n'))
        );
        assert!(validate_chat_payload("\u{1b}[2J").is_err());
    }

    #[test]
    fn test_validate_length_counts_characters() {
        let at_limit = "é".repeat(MAX_PAYLOAD_CHARS);
        assert!(validate_chat_payload(&at_limit).is_ok());

        let over = "a".repeat(MAX_PAYLOAD_CHARS + 1);
        assert_eq!(
            validate_chat_payload(&over),
            Err(PayloadError::TooLong {
                len: MAX_PAYLOAD_CHARS + 1,
                max: MAX_PAYLOAD_CHARS,
            })
        );
    }

    #[test]
    fn test_envelope_bincode_serialization() {
        let envelope = Envelope::chat("alice", "hello");
        let serialized = bincode::serialize(&envelope).unwrap();
        let deserialized: Envelope = bincode::deserialize(&serialized).unwrap();
        assert_eq!(deserialized, envelope);
    }
}

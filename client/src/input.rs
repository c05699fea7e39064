//! Turns lines typed by the user into outgoing chat envelopes

use shared::{validate_chat_payload, Envelope, PayloadError};

pub const QUIT_COMMAND: &str = "/quit";

#[derive(Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// A valid chat message ready to go on the wire
    Send(Envelope),
    /// The line failed validation and was not sent
    Rejected(PayloadError),
    /// Blank line, nothing to do
    Skip,
    Quit,
}

/// Stamps outgoing messages with the local identity and counts them
pub struct InputManager {
    identity: String,
    sent: u64,
}

impl InputManager {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            sent: 0,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn process_line(&mut self, line: &str) -> InputEvent {
        let line = line.trim_end_matches(['\r', '\n']);

        if line.trim().is_empty() {
            return InputEvent::Skip;
        }
        if line.trim() == QUIT_COMMAND {
            return InputEvent::Quit;
        }

        // Same checks the server applies, so bad input never hits the wire
        if let Err(e) = validate_chat_payload(line) {
            return InputEvent::Rejected(e);
        }

        self.sent += 1;
        InputEvent::Send(Envelope::chat(self.identity.as_str(), line))
    }
}

//! Plain-text rendering of the conversation

use shared::Envelope;
use std::io::{self, Write};

pub const CLIENT_SENDER: &str = "[Client]";

/// Writes one numbered row per message to the underlying writer
pub struct Renderer<W: Write> {
    out: W,
    rows: u64,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, rows: 0 }
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn render(&mut self, envelope: &Envelope) -> io::Result<()> {
        self.print_row(&envelope.sender, &envelope.payload)
    }

    /// Local status line that did not come from the server
    pub fn notice(&mut self, text: &str) -> io::Result<()> {
        self.print_row(CLIENT_SENDER, text)
    }

    fn print_row(&mut self, sender: &str, text: &str) -> io::Result<()> {
        self.rows += 1;
        writeln!(self.out, "[{}] {} : {}", self.rows, sender, text)?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{MessageKind, AUTHORISED};

    #[test]
    fn test_rows_are_numbered() {
        let mut renderer = Renderer::new(Vec::new());
        renderer.notice("Connecting").unwrap();
        renderer
            .render(&Envelope::server(MessageKind::Auth, AUTHORISED))
            .unwrap();
        renderer.render(&Envelope::chat("bob", "hi")).unwrap();

        let text = String::from_utf8(renderer.output().clone()).unwrap();
        assert_eq!(
            text,
            "[1] [Client] : Connecting\n[2] [Server] : Authorised\n[3] bob : hi\n"
        );
        assert_eq!(renderer.rows(), 3);
    }
}

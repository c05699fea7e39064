use crate::input::{InputEvent, InputManager};
use crate::rendering::Renderer;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use shared::{Envelope, EnvelopeCodec, MessageKind, AUTHORISED, UNAUTHORISED};
use std::io::{self, Stdout, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

/// Why a chat session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server rejected our token or name
    Unauthorised,
    /// The server closed the connection
    Closed,
    /// The server sent something we could not decode
    DecodeError,
    /// The user asked to leave
    Quit,
}

pub struct Client<T, W: Write> {
    framed: Framed<T, EnvelopeCodec>,
    token: String,
    authorised: bool,
    input: InputManager,
    renderer: Renderer<W>,
}

impl Client<TcpStream, Stdout> {
    /// Dials the server. Without a username the local socket address is
    /// used as identity.
    pub async fn connect(
        server_addr: &str,
        token: String,
        username: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut renderer = Renderer::new(io::stdout());
        renderer.notice("Connecting to the server...")?;

        let stream = TcpStream::connect(server_addr).await?;
        let local_addr = stream.local_addr()?;
        renderer.notice(&format!("Connected, my address - {}", local_addr))?;

        let identity = username.unwrap_or_else(|| local_addr.to_string());
        Ok(Self::new(stream, token, identity, renderer))
    }
}

impl<T, W> Client<T, W>
where
    T: AsyncRead + AsyncWrite + Unpin,
    W: Write,
{
    pub fn new(transport: T, token: String, identity: String, renderer: Renderer<W>) -> Self {
        Self {
            framed: Framed::new(transport, EnvelopeCodec::new()),
            token,
            authorised: false,
            input: InputManager::new(identity),
            renderer,
        }
    }

    pub fn is_authorised(&self) -> bool {
        self.authorised
    }

    pub fn renderer(&self) -> &Renderer<W> {
        &self.renderer
    }

    /// Chat lines sent so far in this session
    pub fn messages_sent(&self) -> u64 {
        self.input.sent()
    }

    /// Authenticates, then relays lines from `input` and renders incoming
    /// envelopes until either side ends the session.
    ///
    /// Input is not read until the server has authorised us, so lines typed
    /// early wait in the input buffer instead of being dropped.
    pub async fn run<R>(&mut self, input: R) -> Result<SessionEnd, Box<dyn std::error::Error>>
    where
        R: AsyncBufRead + Unpin,
    {
        let auth = Envelope::auth(self.input.identity(), self.token.as_str());
        self.framed.send(auth).await?;
        info!("Sent AUTH as {}", self.input.identity());

        let mut lines = input.lines();
        let mut input_open = true;

        loop {
            tokio::select! {
                incoming = self.framed.next() => match incoming {
                    Some(Ok(envelope)) => {
                        if let Some(end) = self.handle_envelope(envelope)? {
                            return Ok(end);
                        }
                    }
                    Some(Err(e)) => {
                        self.renderer.notice(&format!("Error decoding message - {}", e))?;
                        return Ok(SessionEnd::DecodeError);
                    }
                    None => {
                        self.renderer.notice("Connection closed")?;
                        return Ok(SessionEnd::Closed);
                    }
                },

                line = lines.next_line(), if input_open && self.authorised => match line? {
                    Some(line) => {
                        if let Some(end) = self.handle_line(&line).await? {
                            return Ok(end);
                        }
                    }
                    None => {
                        debug!("Input closed, still receiving");
                        input_open = false;
                    }
                },
            }
        }
    }

    fn handle_envelope(&mut self, envelope: Envelope) -> io::Result<Option<SessionEnd>> {
        self.renderer.render(&envelope)?;

        match envelope.kind {
            MessageKind::Auth if envelope.payload == UNAUTHORISED => {
                warn!("Server rejected authentication");
                return Ok(Some(SessionEnd::Unauthorised));
            }
            MessageKind::Auth if envelope.payload == AUTHORISED => {
                self.authorised = true;
            }
            MessageKind::Error => {
                warn!("Server reported an error: {}", envelope.payload);
            }
            _ => {}
        }

        Ok(None)
    }

    async fn handle_line(&mut self, line: &str) -> io::Result<Option<SessionEnd>> {
        match self.input.process_line(line) {
            InputEvent::Send(envelope) => {
                // The server never echoes our own messages back.
                self.renderer.render(&envelope)?;
                if let Err(e) = self.framed.send(envelope).await {
                    self.renderer.notice(&format!("Could not send message - {}", e))?;
                }
            }
            InputEvent::Rejected(e) => {
                self.renderer.notice(&format!("Message not sent - {}", e))?;
            }
            InputEvent::Skip => {}
            InputEvent::Quit => return Ok(Some(SessionEnd::Quit)),
        }

        Ok(None)
    }
}

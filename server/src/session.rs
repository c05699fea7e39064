//! Per-connection session state
//!
//! A [`Session`] is the server's view of one live client connection. The read
//! half of the transport and the authentication state are owned by the single
//! task handling the connection. The write half lives in a [`SessionHandle`],
//! which is reference counted so the registry and other connections'
//! broadcasts can deliver envelopes to this client.

use futures::{SinkExt, StreamExt};
use log::debug;
use shared::{CodecError, Envelope, EnvelopeCodec};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::codec::{FramedRead, FramedWrite};

type BoxedReader = Box<dyn AsyncRead + Send + Sync + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type EnvelopeWriter = FramedWrite<BoxedWriter, EnvelopeCodec>;

/// Connection lifecycle as seen by the handling task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unauthenticated,
    Authenticated,
    Terminated,
}

/// Shareable write side of a session
///
/// Sends are serialized by an internal lock, so concurrent broadcasts never
/// interleave bytes of two envelopes. Once closed, every further send fails.
pub struct SessionHandle {
    writer: Mutex<Option<EnvelopeWriter>>,
}

/// Exclusive hold on a session's write half
///
/// Every other sender, broadcasts included, waits until the guard is dropped.
pub struct WriterGuard<'a> {
    writer: MutexGuard<'a, Option<EnvelopeWriter>>,
}

impl WriterGuard<'_> {
    pub async fn send_envelope(&mut self, envelope: Envelope) -> Result<(), CodecError> {
        send_on(&mut self.writer, envelope).await
    }
}

async fn send_on(
    writer: &mut Option<EnvelopeWriter>,
    envelope: Envelope,
) -> Result<(), CodecError> {
    match writer.as_mut() {
        Some(writer) => writer.send(envelope).await,
        None => Err(CodecError::Io(io::Error::new(
            io::ErrorKind::NotConnected,
            "session is closed",
        ))),
    }
}

impl SessionHandle {
    fn new(writer: BoxedWriter) -> Self {
        Self {
            writer: Mutex::new(Some(FramedWrite::new(writer, EnvelopeCodec::new()))),
        }
    }

    /// Writes one envelope and flushes it to the transport.
    pub async fn send_envelope(&self, envelope: Envelope) -> Result<(), CodecError> {
        let mut guard = self.writer.lock().await;
        send_on(&mut guard, envelope).await
    }

    /// Locks the write half so the holder's envelopes go out before anyone
    /// else's.
    pub async fn lock(&self) -> WriterGuard<'_> {
        WriterGuard {
            writer: self.writer.lock().await,
        }
    }

    /// Shuts down the write half. Calling it again is a no-op.
    pub async fn close(&self) {
        let mut guard = self.writer.lock().await;
        if let Some(writer) = guard.take() {
            let mut transport = writer.into_inner();
            if let Err(e) = transport.shutdown().await {
                debug!("Error while shutting down transport: {}", e);
            }
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.writer.lock().await.is_none()
    }
}

pub struct Session {
    identity: String,
    authorised: bool,
    reader: FramedRead<BoxedReader, EnvelopeCodec>,
    handle: Arc<SessionHandle>,
}

impl Session {
    /// Wraps a freshly accepted transport. The peer address is the identity
    /// until the client authenticates.
    pub fn new<T>(transport: T, peer: impl Into<String>) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + Sync + 'static,
    {
        let (reader, writer) = tokio::io::split(transport);
        let reader: BoxedReader = Box::new(reader);
        let writer: BoxedWriter = Box::new(writer);
        Self {
            identity: peer.into(),
            authorised: false,
            reader: FramedRead::new(reader, EnvelopeCodec::new()),
            handle: Arc::new(SessionHandle::new(writer)),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_authorised(&self) -> bool {
        self.authorised
    }

    pub fn state(&self) -> ConnectionState {
        if self.authorised {
            ConnectionState::Authenticated
        } else {
            ConnectionState::Unauthenticated
        }
    }

    pub fn handle(&self) -> Arc<SessionHandle> {
        Arc::clone(&self.handle)
    }

    /// Marks the session authorised under the claimed identity. There is no
    /// way back; a session that misbehaves is torn down instead.
    pub fn authorise(&mut self, identity: String) {
        self.identity = identity;
        self.authorised = true;
    }

    /// Waits for the next envelope. `Ok(None)` is a clean end of stream.
    pub async fn receive_envelope(&mut self) -> Result<Option<Envelope>, CodecError> {
        self.reader.next().await.transpose()
    }

    pub async fn send_envelope(&self, envelope: Envelope) -> Result<(), CodecError> {
        self.handle.send_envelope(envelope).await
    }

    pub async fn close(&self) {
        self.handle.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::MessageKind;

    fn peer_pair() -> (
        Session,
        FramedRead<tokio::io::ReadHalf<tokio::io::DuplexStream>, EnvelopeCodec>,
        FramedWrite<tokio::io::WriteHalf<tokio::io::DuplexStream>, EnvelopeCodec>,
    ) {
        let (server_side, client_side) = tokio::io::duplex(4096);
        let session = Session::new(server_side, "127.0.0.1:5000");
        let (read, write) = tokio::io::split(client_side);
        (
            session,
            FramedRead::new(read, EnvelopeCodec::new()),
            FramedWrite::new(write, EnvelopeCodec::new()),
        )
    }

    #[tokio::test]
    async fn test_new_session_is_unauthenticated() {
        let (session, _, _) = peer_pair();
        assert_eq!(session.identity(), "127.0.0.1:5000");
        assert!(!session.is_authorised());
        assert_eq!(session.state(), ConnectionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_authorise_replaces_identity() {
        let (mut session, _, _) = peer_pair();
        session.authorise("alice".to_string());
        assert_eq!(session.identity(), "alice");
        assert_eq!(session.state(), ConnectionState::Authenticated);
    }

    #[tokio::test]
    async fn test_receive_and_send() {
        let (mut session, mut client_rx, mut client_tx) = peer_pair();

        client_tx.send(Envelope::chat("x", "ping")).await.unwrap();
        let received = session.receive_envelope().await.unwrap().unwrap();
        assert_eq!(received.payload, "ping");

        session
            .send_envelope(Envelope::server(MessageKind::Chat, "pong"))
            .await
            .unwrap();
        let reply = client_rx.next().await.unwrap().unwrap();
        assert_eq!(reply.payload, "pong");
    }

    #[tokio::test]
    async fn test_receive_reports_clean_end() {
        let (mut session, client_rx, client_tx) = peer_pair();
        drop(client_rx);
        drop(client_tx);
        assert!(session.receive_envelope().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (session, mut client_rx, _client_tx) = peer_pair();
        session.close().await;
        session.close().await;
        assert!(session.handle().is_closed().await);

        assert!(session
            .send_envelope(Envelope::chat("x", "late"))
            .await
            .is_err());
        assert!(client_rx.next().await.is_none());
    }

    #[tokio::test]
    async fn test_locked_writer_goes_first() {
        let (session, mut client_rx, _client_tx) = peer_pair();
        let handle = session.handle();

        let mut guard = handle.lock().await;
        let other = session.handle();
        let queued = tokio::spawn(async move {
            other
                .send_envelope(Envelope::chat("bob", "queued"))
                .await
                .unwrap();
        });
        tokio::task::yield_now().await;

        guard
            .send_envelope(Envelope::server(MessageKind::Auth, "first"))
            .await
            .unwrap();
        drop(guard);
        queued.await.unwrap();

        assert_eq!(client_rx.next().await.unwrap().unwrap().payload, "first");
        assert_eq!(client_rx.next().await.unwrap().unwrap().payload, "queued");
    }
}

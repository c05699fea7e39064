//! Connection handling and broadcast for the chat relay
//!
//! One [`Relay::handle_connection`] call runs per accepted connection. It
//! reads envelopes in a loop and drives the session through
//! `Unauthenticated -> Authenticated -> Terminated`:
//!
//! - AUTH with the right token registers the session under the claimed
//!   sender, replies "Authorised" and then announces it with a "Joined"
//!   notice. The reply is always the first envelope the client sees.
//! - Anything else before authentication is answered with "Unauthorised"
//!   and the connection is closed.
//! - CHAT after authentication is validated, stamped with the session's
//!   identity and broadcast to every other registered session.
//! - End of stream or a decode failure unregisters the session, announces
//!   "Disconnected" and closes the transport.
//!
//! The identity claimed at AUTH time is trusted as-is. Anyone holding the
//! token can pick any free display name.

use crate::registry::Registry;
use crate::session::{ConnectionState, Session};
use futures::future::join_all;
use log::{debug, info, warn};
use shared::{
    validate_chat_payload, Envelope, MessageKind, AUTHORISED, DISCONNECTED, JOINED, UNAUTHORISED,
};
use tokio::io::{AsyncRead, AsyncWrite};

/// State shared by every connection task: the token and the registry
pub struct Relay {
    token: String,
    registry: Registry,
}

impl Relay {
    pub fn new(token: impl Into<String>, max_clients: usize) -> Self {
        Self {
            token: token.into(),
            registry: Registry::new(max_clients),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs the session state machine until the connection terminates
    ///
    /// `peer` is the transport address, used as identity until the client
    /// authenticates. The transport is closed on every exit path.
    pub async fn handle_connection<T>(&self, transport: T, peer: String)
    where
        T: AsyncRead + AsyncWrite + Send + Sync + 'static,
    {
        let mut session = Session::new(transport, peer);
        debug!("Session opened for {}", session.identity());

        loop {
            let next = match session.receive_envelope().await {
                Ok(Some(envelope)) => {
                    debug!("Incoming message from {}: {:?}", session.identity(), envelope);
                    self.process_envelope(&mut session, envelope).await
                }
                Ok(None) => {
                    info!("Client disconnected: {}", session.identity());
                    self.drop_session(&session).await;
                    ConnectionState::Terminated
                }
                Err(e) => {
                    warn!("Could not read message from {}: {}", session.identity(), e);
                    self.drop_session(&session).await;
                    ConnectionState::Terminated
                }
            };

            if next == ConnectionState::Terminated {
                break;
            }
        }

        session.close().await;
        debug!("Session closed for {}", session.identity());
    }

    /// Applies one envelope to the session and returns the resulting state
    async fn process_envelope(
        &self,
        session: &mut Session,
        envelope: Envelope,
    ) -> ConnectionState {
        match (session.state(), envelope.kind) {
            (ConnectionState::Unauthenticated, MessageKind::Auth) => {
                self.authenticate(session, envelope).await
            }
            (ConnectionState::Unauthenticated, kind) => {
                warn!(
                    "{:?} message from unauthenticated client {}",
                    kind,
                    session.identity()
                );
                self.reject(session).await
            }
            (_, MessageKind::Auth) => {
                debug!("{} is already authorised, ignoring AUTH", session.identity());
                ConnectionState::Authenticated
            }
            (_, MessageKind::Chat) => self.relay_chat(session, envelope).await,
            (_, MessageKind::Error) => {
                warn!(
                    "Ignoring ERROR message from client {}: {}",
                    session.identity(),
                    envelope.payload
                );
                ConnectionState::Authenticated
            }
        }
    }

    async fn authenticate(&self, session: &mut Session, envelope: Envelope) -> ConnectionState {
        if envelope.payload != self.token {
            warn!("Invalid token from {}", session.identity());
            return self.reject(session).await;
        }

        let identity = if envelope.sender.is_empty() {
            session.identity().to_string()
        } else {
            envelope.sender
        };

        // Broadcasts reach the session as soon as it is registered, so its
        // writer stays locked until "Authorised" is out.
        let handle = session.handle();
        let mut writer = handle.lock().await;

        if let Err(e) = self.registry.try_add(&identity, session.handle()).await {
            drop(writer);
            warn!("Rejecting {} from {}: {}", identity, session.identity(), e);
            return self.reject(session).await;
        }

        info!("{} authorised as {}", session.identity(), identity);
        session.authorise(identity);

        let reply = Envelope::server(MessageKind::Auth, AUTHORISED);
        if let Err(e) = writer.send_envelope(reply).await {
            warn!("Could not send message to {}: {}", session.identity(), e);
        }
        drop(writer);

        self.broadcast(Envelope::chat(session.identity(), JOINED), session.identity())
            .await;

        ConnectionState::Authenticated
    }

    async fn relay_chat(&self, session: &Session, mut envelope: Envelope) -> ConnectionState {
        if let Err(e) = validate_chat_payload(&envelope.payload) {
            debug!("Invalid chat payload from {}: {}", session.identity(), e);
            self.reply(session, Envelope::server(MessageKind::Error, e.to_string()))
                .await;
            return ConnectionState::Authenticated;
        }

        // Never trust the client-supplied sender on chat messages.
        envelope.sender = session.identity().to_string();
        self.broadcast(envelope, session.identity()).await;

        ConnectionState::Authenticated
    }

    async fn reject(&self, session: &Session) -> ConnectionState {
        self.reply(session, Envelope::server(MessageKind::Auth, UNAUTHORISED))
            .await;
        ConnectionState::Terminated
    }

    /// Cleanup for a connection that ended or failed to decode. Sessions that
    /// never authenticated were never announced, so nothing is broadcast.
    async fn drop_session(&self, session: &Session) {
        if !session.is_authorised() {
            return;
        }

        self.registry.remove(session.identity()).await;
        self.broadcast(
            Envelope::chat(session.identity(), DISCONNECTED),
            session.identity(),
        )
        .await;
    }

    async fn reply(&self, session: &Session, envelope: Envelope) {
        if let Err(e) = session.send_envelope(envelope).await {
            warn!("Could not send message to {}: {}", session.identity(), e);
        }
    }

    /// Delivers `envelope` to every registered session except `origin`
    ///
    /// Works on a registry snapshot, so the registry lock is released before
    /// any network write. Recipients are written to concurrently and a failed
    /// delivery does not affect the others. Returns the number of successful
    /// deliveries.
    pub async fn broadcast(&self, envelope: Envelope, origin: &str) -> usize {
        let recipients = self.registry.snapshot().await;

        let deliveries = recipients
            .into_iter()
            .filter(|(identity, _)| identity != origin)
            .map(|(identity, handle)| {
                let envelope = envelope.clone();
                async move {
                    match handle.send_envelope(envelope).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("Could not send message to {}: {}", identity, e);
                            false
                        }
                    }
                }
            });

        let delivered = join_all(deliveries)
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count();

        debug!("Broadcast from {} reached {} clients", origin, delivered);
        delivered
    }
}

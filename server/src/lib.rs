//! # Chat Relay Server Library
//!
//! This library provides the server side of a minimal real-time chat relay.
//! Clients connect over TCP, authenticate with a shared token, and every chat
//! message an authenticated client sends is relayed to all other connected
//! clients.
//!
//! ## Core Responsibilities
//!
//! ### Authentication
//! The first envelope on every connection must be an AUTH carrying the
//! server token. A correct token registers the client under the display name
//! it claims; anything else gets an "Unauthorised" reply and the connection
//! is closed.
//!
//! ### Broadcasting
//! Chat messages are stamped with the sender's authenticated identity and
//! fanned out to every other registered session. Joins and disconnects are
//! announced the same way, as ordinary chat envelopes.
//!
//! ### Session Lifecycle
//! Each connection moves through `Unauthenticated -> Authenticated ->
//! Terminated`. Termination on end of stream or a decode failure always
//! unregisters the session and closes its transport.
//!
//! ## Architecture Design
//!
//! ### Task Per Connection
//! The listener spawns one tokio task per accepted connection. A task owns its
//! session's read half and all of its state; no other task mutates it.
//!
//! ### Shared Registry
//! The [`registry::Registry`] is the only state shared between tasks. Its lock
//! guards map updates and snapshot copies only. Broadcasts copy the registry
//! first and write to recipients after releasing the lock, so a slow client
//! never holds up registration of others.
//!
//! ### Best-Effort Delivery
//! Delivery is fire-and-forget. A failed write to one recipient is logged and
//! does not affect other recipients or the sender's own connection.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! Per-connection state: identity, authorisation flag, framed read half, and
//! the shareable write handle stored in the registry.
//!
//! ### Registry Module (`registry`)
//! The concurrent directory of reachable sessions keyed by identity.
//!
//! ### Connection Module (`connection`)
//! The per-connection state machine and the broadcast algorithm.
//!
//! ### Network Module (`network`)
//! TCP listener and accept loop.
//!
//! ### Token Module (`token`)
//! Random base58 shared token generation.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use server::token::generate_token;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Bind to the address, with a fresh token and room for 64 clients
//!     let server = Server::new("127.0.0.1:8080", generate_token(), 64).await?;
//!     println!("Token: {}", server.relay().token());
//!
//!     // Accept connections until the process exits
//!     server.run().await;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Security Considerations
//!
//! The display name claimed at AUTH time is not verified. Anyone who knows the
//! token can pick any name that is not currently in use. Chat envelopes
//! cannot spoof the sender, since the server overwrites it.

pub mod connection;
pub mod network;
pub mod registry;
pub mod session;
pub mod token;

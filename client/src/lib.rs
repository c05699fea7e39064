//! # Chat Relay Client Library
//!
//! This library provides the terminal client for the chat relay. It connects
//! to the server, authenticates with the shared token, and then exchanges
//! messages: lines read from the terminal are sent as chat envelopes, and
//! everything the server relays is printed as it arrives.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! Connection handling and the main loop:
//! - Dialing the server and sending the AUTH envelope
//! - Waiting for "Authorised" before reading user input
//! - Multiplexing terminal input and incoming envelopes
//! - Ending the session on "Unauthorised", server close or `/quit`
//!
//! ### Input Module (`input`)
//! Turns raw terminal lines into chat envelopes, applying the same payload
//! validation the server does so rejected messages never leave the client.
//!
//! ### Rendering Module (`rendering`)
//! Prints messages as numbered rows of the form `[n] sender : payload`.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use tokio::io::BufReader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client =
//!         Client::connect("127.0.0.1:8080", "token".to_string(), Some("alice".to_string()))
//!             .await?;
//!
//!     let end = client.run(BufReader::new(tokio::io::stdin())).await?;
//!     println!("Session ended: {:?}", end);
//!
//!     Ok(())
//! }
//! ```

pub mod input;
pub mod network;
pub mod rendering;

//! Server network layer accepting TCP connections for the relay

use crate::connection::Relay;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Listening socket plus the relay state every connection task shares
pub struct Server {
    listener: TcpListener,
    relay: Arc<Relay>,
}

impl Server {
    pub async fn new(
        addr: &str,
        token: String,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            relay: Arc::new(Relay::new(token, max_clients)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn relay(&self) -> Arc<Relay> {
        Arc::clone(&self.relay)
    }

    /// Accepts connections forever, one task per connection
    ///
    /// A failing connection never affects the accept loop; accept errors are
    /// logged and retried after a short pause.
    pub async fn run(&self) {
        info!("Server started successfully");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("Incoming connection from {}", addr);

                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                    }

                    let relay = Arc::clone(&self.relay);
                    tokio::spawn(async move {
                        relay.handle_connection(stream, addr.to_string()).await;
                    });
                }
                Err(e) => {
                    error!("Could not accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

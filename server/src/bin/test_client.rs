use futures::{SinkExt, StreamExt};
use shared::{Envelope, EnvelopeCodec, MessageKind, UNAUTHORISED};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_util::codec::Framed;

// Scripted client: authenticates, sends a few chat lines and prints whatever
// the server relays back. Usage: test_client <token> [name] [addr]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let token = args.next().ok_or("missing token argument")?;
    let name = args.next().unwrap_or_else(|| "test-client".to_string());
    let server_addr = args.next().unwrap_or_else(|| "127.0.0.1:8080".to_string());

    let stream = TcpStream::connect(&server_addr).await?;
    println!("Connected to {} from {}", server_addr, stream.local_addr()?);
    let mut framed = Framed::new(stream, EnvelopeCodec::new());

    println!("Sending AUTH as {}", name);
    framed.send(Envelope::auth(name.as_str(), token)).await?;

    match framed.next().await {
        Some(Ok(reply)) if reply.kind == MessageKind::Auth && reply.payload != UNAUTHORISED => {
            println!("Authenticated: {:?}", reply);
        }
        Some(Ok(reply)) => {
            println!("Authentication failed: {:?}", reply);
            return Ok(());
        }
        Some(Err(e)) => return Err(e.into()),
        None => {
            println!("Server closed the connection");
            return Ok(());
        }
    }

    for i in 0..5 {
        let text = format!("message {} from {}", i, name);
        println!("Sending: {}", text);
        framed.send(Envelope::chat(name.as_str(), text)).await?;

        // Drain anything relayed to us in the meantime
        while let Ok(Some(result)) = timeout(Duration::from_millis(200), framed.next()).await {
            match result {
                Ok(envelope) => println!(
                    "  {:?} {} : {}",
                    envelope.kind, envelope.sender, envelope.payload
                ),
                Err(e) => {
                    println!("Failed to decode envelope: {}", e);
                    return Ok(());
                }
            }
        }

        sleep(Duration::from_secs(1)).await;
    }

    println!("Test client finished");
    Ok(())
}

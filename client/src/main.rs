use clap::Parser;
use client::network::{Client, SessionEnd};
use log::info;
use tokio::io::BufReader;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Token to authenticate with
    #[arg(short = 't', long)]
    token: String,

    /// Name displayed to other users (defaults to the local socket address)
    #[arg(short = 'u', long)]
    username: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    info!("Type a message and press Enter to send, /quit to leave");

    let mut client = Client::connect(&args.server, args.token, args.username).await?;
    let end = client.run(BufReader::new(tokio::io::stdin())).await?;
    info!(
        "Session ended: {:?} ({} messages sent, {} rows shown)",
        end,
        client.messages_sent(),
        client.renderer().rows()
    );

    if end == SessionEnd::Unauthorised {
        return Err("server rejected the token or username".into());
    }

    Ok(())
}

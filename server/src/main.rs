use clap::Parser;
use log::info;
use server::network::Server;
use server::token::generate_token;
use shared::DEFAULT_PORT;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Shared token clients authenticate with (random when omitted)
    #[arg(short, long)]
    token: Option<String>,

    /// Maximum number of concurrently authenticated clients
    #[arg(short, long, default_value = "64")]
    max_clients: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting server...");

    let token = args.token.unwrap_or_else(generate_token);
    let address = format!("{}:{}", args.host, args.port);
    let server = Server::new(&address, token, args.max_clients).await?;

    // The token goes to stdout so it can be piped or copied to clients.
    println!("{}", server.relay().token());

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

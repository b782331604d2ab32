use anyhow::Result;
use authsocks::{Config, Socks5Server, config::DEFAULT_PORT};
use clap::Parser;
use std::num::NonZeroUsize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "A minimal authenticated SOCKS5 proxy", long_about = None)]
struct Args {
    /// Listen port (all interfaces)
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Username clients must authenticate with
    #[arg(short, long)]
    user: String,

    /// Password clients must authenticate with
    #[arg(short = 'P', long)]
    pass: String,

    /// Maximum number of clients served at once (unbounded by default)
    #[arg(short, long)]
    max_connections: Option<NonZeroUsize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse args
    let args = Args::parse();

    // Initialize tracing subscriber
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    let config = Config::new(args.port, args.user, args.pass)?;

    // Instantiate server
    let mut server = Socks5Server::new(config).with_max_connections(args.max_connections);

    // Run it
    info!(
        "Starting SOCKS5 proxy on port {} for user {}",
        server.config.listen_port, server.config.username
    );
    server.run().await
}
